//! Standards mapping - per line-class fastener and gasket defaults
//!
//! Loaded from `catalog/standards.yaml`. Rows are keyed by line class,
//! optionally narrowed to one project. The table must carry a DEFAULT
//! row; a missing DEFAULT is a configuration fault that aborts the task.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::EngineError;
use crate::entities::part::FaceType;

/// Defaults one line class supplies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardsRow {
    /// Bolt material designation, e.g. "A193 B7"
    pub bolt_material: String,

    /// Gasket type, e.g. "spiral_wound"
    pub gasket_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_type: Option<FaceType>,

    /// Tightening torque per bolt spec, Nm
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub torque_nm: BTreeMap<String, f64>,
}

/// One table row: a line class, optionally scoped to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardsMapping {
    pub line_class: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(flatten)]
    pub defaults: StandardsRow,
}

/// The standards table
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StandardsTable {
    #[serde(default)]
    pub rows: Vec<StandardsMapping>,
}

impl StandardsTable {
    pub const DEFAULT_KEY: &'static str = "DEFAULT";

    /// Load the table from a file, requiring a DEFAULT row
    pub fn load(path: &std::path::Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse the table from YAML, requiring a DEFAULT row
    pub fn from_yaml(content: &str) -> Result<Self, EngineError> {
        let table: StandardsTable =
            serde_yml::from_str(content).map_err(|e| EngineError::Yaml(e.to_string()))?;
        if !table.rows.iter().any(|m| m.line_class == Self::DEFAULT_KEY) {
            return Err(EngineError::ConfigurationFault(
                "standards table has no DEFAULT row".to_string(),
            ));
        }
        Ok(table)
    }

    /// Resolve defaults through the fallback chain: exact
    /// (line_class, project_id), then (line_class, no project), then the
    /// DEFAULT row that closes the chain.
    pub fn resolve_defaults(
        &self,
        line_class: Option<&str>,
        project_id: Option<&str>,
    ) -> Result<&StandardsRow, EngineError> {
        if let Some(line_class) = line_class {
            if project_id.is_some() {
                if let Some(row) = self.rows.iter().find(|m| {
                    m.line_class == line_class && m.project_id.as_deref() == project_id
                }) {
                    return Ok(&row.defaults);
                }
            }
            if let Some(row) = self
                .rows
                .iter()
                .find(|m| m.line_class == line_class && m.project_id.is_none())
            {
                return Ok(&row.defaults);
            }
        }
        self.rows
            .iter()
            .find(|m| m.line_class == Self::DEFAULT_KEY && m.project_id.is_none())
            .map(|m| &m.defaults)
            .ok_or_else(|| {
                EngineError::ConfigurationFault("standards table has no DEFAULT row".to_string())
            })
    }
}
