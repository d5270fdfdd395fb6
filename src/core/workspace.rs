//! Workspace discovery and structure
//!
//! A camber workspace is a directory tree with a `.camber/` marker holding
//! the engine configuration, a read-only `catalog/` (parts, templates,
//! standards), and per-record directories for everything the engine
//! writes.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Represents a camber workspace
#[derive(Debug)]
pub struct Workspace {
    /// Root directory (parent of .camber/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(".camber").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let camber_dir = root.join(".camber");
        if camber_dir.exists() {
            return Err(WorkspaceError::AlreadyExists(root.clone()));
        }

        std::fs::create_dir_all(&camber_dir)
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        std::fs::write(camber_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        let dirs = [
            "catalog/parts",
            "catalog/templates",
            "tasks",
            "constraints",
            "reviews",
            "patterns",
            "corpus",
            "reports",
        ];
        for dir in dirs {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Camber workspace configuration

inference:
  # Port origins within this distance (mm) are considered candidate mates
  proximity_threshold_mm: 500.0
  # Port axes within this angle (deg) of anti-parallel are candidates
  antiparallel_tol_deg: 15.0

solver:
  # Pending constraints at or above this confidence participate in placement
  pending_floor: 0.8
  # Minimum clearance (mm) between placed bounding boxes
  collision_clearance_mm: 0.0
  # Pose disagreement (mm) beyond which a part is over-constrained
  pose_tol_mm: 1.0

matcher:
  # Ranked matches below this cosine similarity are discarded
  similarity_floor: 0.3
  top_k: 5

pattern:
  # Support a pattern needs before inference consults it as a prior
  min_support: 3
  # Weight of review feedback in confidence adjustment
  feedback_weight: 0.3
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .camber configuration directory
    pub fn camber_dir(&self) -> PathBuf {
        self.root.join(".camber")
    }

    /// Load the workspace configuration, falling back to defaults
    pub fn config(&self) -> WorkspaceConfig {
        let path = self.camber_dir().join("config.yaml");
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_yml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Directory holding the parts catalog
    pub fn parts_dir(&self) -> PathBuf {
        self.root.join("catalog/parts")
    }

    /// Directory holding connection templates
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("catalog/templates")
    }

    /// The standards mapping file
    pub fn standards_path(&self) -> PathBuf {
        self.root.join("catalog/standards.yaml")
    }

    /// Get the directory for a given entity prefix
    pub fn entity_directory(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Task => "tasks",
            EntityPrefix::Con => "constraints",
            EntityPrefix::Rvw => "reviews",
            EntityPrefix::Ptrn => "patterns",
            EntityPrefix::Rpt => "reports",
        }
    }

    /// Get the path for an entity file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.root
            .join(Self::entity_directory(id.prefix()))
            .join(format!("{}.camber.yaml", id))
    }

    /// Directory for entities of a given prefix
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(Self::entity_directory(prefix))
    }

    /// Directory holding the part-name vector corpus
    pub fn corpus_dir(&self) -> PathBuf {
        self.root.join("corpus")
    }

    /// Iterate all entity files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        let dir = self.entity_dir(prefix);
        walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(".camber.yaml"))
            .map(|e| e.path().to_path_buf())
    }
}

/// Workspace configuration loaded from .camber/config.yaml
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub inference: InferenceSettings,
    pub solver: SolverSettings,
    pub matcher: MatcherSettings,
    pub pattern: PatternSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub proximity_threshold_mm: f64,
    pub antiparallel_tol_deg: f64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            proximity_threshold_mm: 500.0,
            antiparallel_tol_deg: 15.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub pending_floor: f64,
    pub collision_clearance_mm: f64,
    pub pose_tol_mm: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            pending_floor: 0.8,
            collision_clearance_mm: 0.0,
            pose_tol_mm: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatcherSettings {
    pub similarity_floor: f64,
    pub top_k: usize,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            similarity_floor: 0.3,
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternSettings {
    pub min_support: u32,
    pub feedback_weight: f64,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            min_support: 3,
            feedback_weight: 0.3,
        }
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not a camber workspace (searched from {searched_from:?}). Run 'camber init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("camber workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();

        assert!(ws.camber_dir().join("config.yaml").exists());
        assert!(ws.parts_dir().is_dir());
        assert!(ws.templates_dir().is_dir());
        assert!(ws.entity_dir(EntityPrefix::Con).is_dir());
        assert!(ws.corpus_dir().is_dir());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let err = Workspace::init(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));
    }

    #[test]
    fn test_discover_finds_marker_from_subdir() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let ws = Workspace::discover_from(&subdir).unwrap();
        assert_eq!(
            ws.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }

    #[test]
    fn test_default_config_parses() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        let config = ws.config();
        assert_eq!(config.matcher.top_k, 5);
        assert!((config.pattern.feedback_weight - 0.3).abs() < 1e-12);
        assert_eq!(config.pattern.min_support, 3);
    }
}
