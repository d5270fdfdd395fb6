//! Parts catalog registry
//!
//! In-memory index over the YAML parts catalog. Lookups are by exact
//! part_id; iteration order is part_id order so every downstream stage is
//! deterministic regardless of directory listing order.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::EngineError;
use crate::core::loader;
use crate::core::workspace::Workspace;
use crate::entities::part::Part;

/// Read-only index over the parts catalog
#[derive(Debug, Default)]
pub struct PartRegistry {
    parts: BTreeMap<String, Part>,
}

impl PartRegistry {
    /// Load every part file under the workspace catalog
    pub fn load(workspace: &Workspace) -> Result<Self, EngineError> {
        Self::load_dir(&workspace.parts_dir())
    }

    /// Load every part file under the given directory
    pub fn load_dir(dir: &Path) -> Result<Self, EngineError> {
        let parts: Vec<Part> =
            loader::load_all(dir).map_err(|e| EngineError::Yaml(e.to_string()))?;
        Ok(Self::from_parts(parts))
    }

    pub fn from_parts(parts: Vec<Part>) -> Self {
        let parts = parts.into_iter().map(|p| (p.part_id.clone(), p)).collect();
        Self { parts }
    }

    pub fn get(&self, part_id: &str) -> Option<&Part> {
        self.parts.get(part_id)
    }

    /// Lookup that treats a miss as a recordable orphan, not a crash
    pub fn require(&self, part_id: &str) -> Result<&Part, EngineError> {
        self.get(part_id)
            .ok_or_else(|| EngineError::part_not_found(part_id))
    }

    /// All parts in part_id order
    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
