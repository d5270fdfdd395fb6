//! Entity loading utilities
//!
//! Generic helpers for loading and saving YAML entities, reducing
//! boilerplate in command implementations.

use miette::{IntoDiagnostic, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Load all entities of type T from a directory
///
/// Scans the directory for .yaml files and deserializes them in filename
/// order (stable across runs). Files that fail to parse are silently
/// skipped.
pub fn load_all<T: DeserializeOwned + 'static>(dir: &Path) -> Result<Vec<T>> {
    let mut entities = Vec::new();

    if !dir.exists() {
        return Ok(entities);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .into_diagnostic()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "yaml"))
        .collect();
    paths.sort();

    for path in paths {
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(entity) = serde_yml::from_str::<T>(&content) {
                entities.push(entity);
            }
        }
    }

    Ok(entities)
}

/// Load all entities of type T, failing on the first file that does not
/// parse. Configuration inputs (connection templates) load through this
/// variant: a corrupt file aborts the run instead of being skipped.
pub fn load_all_strict<T: DeserializeOwned + 'static>(dir: &Path) -> Result<Vec<T>> {
    let mut entities = Vec::new();

    if !dir.exists() {
        return Ok(entities);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .into_diagnostic()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "yaml"))
        .collect();
    paths.sort();

    for path in paths {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        let entity = serde_yml::from_str::<T>(&content)
            .map_err(|e| miette::miette!("{}: {}", path.display(), e))?;
        entities.push(entity);
    }

    Ok(entities)
}

/// Find an entity file by ID (supports partial matching)
pub fn find_entity_file(dir: &Path, id: &str) -> Option<PathBuf> {
    if !dir.exists() {
        return None;
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "yaml"))
        .collect();
    paths.sort();

    paths.into_iter().find(|path| {
        let filename = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        filename.contains(id) || filename.starts_with(id)
    })
}

/// Load a single entity by ID
pub fn load_entity<T: DeserializeOwned + 'static>(dir: &Path, id: &str) -> Result<Option<(PathBuf, T)>> {
    if let Some(path) = find_entity_file(dir, id) {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        let entity: T = serde_yml::from_str(&content).into_diagnostic()?;
        return Ok(Some((path, entity)));
    }
    Ok(None)
}

/// Serialize an entity to its YAML file, creating parent directories
pub fn save_entity<T: Serialize>(path: &Path, entity: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(entity).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()?;
    Ok(())
}
