//! Assembly task entity - a BOM plus everything inferred from it
//!
//! The task file is the engine's unit of work: the input BOM, how each
//! line resolved against the catalog, the constraints produced, and the
//! orphans that could not be resolved. Lines are never silently dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::core::entity::Entity;
use crate::core::error::EngineError;
use crate::core::identity::EntityId;

/// One line of an input bill of materials. Either a direct catalog id or
/// a free-text name for the semantic matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,

    #[serde(default = "default_qty")]
    pub qty: u32,
}

fn default_qty() -> u32 {
    1
}

impl BomLine {
    /// The text shown for this line in reports and orphan records
    pub fn label(&self) -> &str {
        self.part_id
            .as_deref()
            .or(self.raw_name.as_deref())
            .unwrap_or("<empty>")
    }
}

/// How a BOM line was resolved to a catalog part
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "method")]
pub enum ResolutionMethod {
    /// part_id referenced the catalog directly
    Direct,
    /// Matched by name similarity
    Matched { similarity: f64 },
}

/// A BOM line successfully bound to a catalog part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLine {
    /// Zero-based index into the task's BOM
    pub line: usize,
    pub part_id: String,
    pub qty: u32,
    #[serde(flatten)]
    pub method: ResolutionMethod,
}

/// A BOM line that could not be bound to a catalog part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphanLine {
    pub line: usize,
    pub label: String,
    pub reason: String,
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Draft,
    Inferred,
    Validated,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Draft => write!(f, "draft"),
            TaskStatus::Inferred => write!(f, "inferred"),
            TaskStatus::Validated => write!(f, "validated"),
        }
    }
}

/// An assembly inference task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyTask {
    pub id: EntityId,
    pub created: DateTime<Utc>,

    pub name: String,

    /// Governing line class for standards resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bom: Vec<BomLine>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolved: Vec<ResolvedLine>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<OrphanLine>,

    /// Constraints inferred for this task, in creation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraint_ids: Vec<EntityId>,
}

impl AssemblyTask {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            created: Utc::now(),
            name: name.into(),
            line_class: None,
            project_id: None,
            status: TaskStatus::Draft,
            bom: Vec::new(),
            resolved: Vec::new(),
            orphans: Vec::new(),
            constraint_ids: Vec::new(),
        }
    }

    /// Total quantity across all BOM lines
    pub fn bom_quantity(&self) -> u32 {
        self.bom.iter().map(|l| l.qty).sum()
    }
}

impl Entity for AssemblyTask {
    const PREFIX: &'static str = "TASK";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

/// Read a BOM from CSV with headers `part_id,raw_name,qty`. Empty cells
/// become None; a missing or unparsable qty defaults to 1.
pub fn read_bom_csv<R: Read>(reader: R) -> Result<Vec<BomLine>, EngineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| EngineError::ConfigurationFault(format!("invalid BOM CSV: {}", e)))?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let part_id_col = col("part_id");
    let raw_name_col = col("raw_name").or_else(|| col("name"));
    let qty_col = col("qty").or_else(|| col("quantity"));

    if part_id_col.is_none() && raw_name_col.is_none() {
        return Err(EngineError::ConfigurationFault(
            "BOM CSV needs a part_id or raw_name column".to_string(),
        ));
    }

    let mut lines = Vec::new();
    for record in csv_reader.records() {
        let record =
            record.map_err(|e| EngineError::ConfigurationFault(format!("invalid BOM CSV: {}", e)))?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        let part_id = cell(part_id_col);
        let raw_name = cell(raw_name_col);
        if part_id.is_none() && raw_name.is_none() {
            continue;
        }

        let qty = cell(qty_col)
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        lines.push(BomLine {
            part_id,
            raw_name,
            qty,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;

    #[test]
    fn test_read_bom_csv() {
        let csv = "part_id,raw_name,qty\nPIPE-DN50,,2\n,50mm weld neck flange,1\n";
        let lines = read_bom_csv(csv.as_bytes()).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].part_id.as_deref(), Some("PIPE-DN50"));
        assert_eq!(lines[0].qty, 2);
        assert_eq!(lines[1].raw_name.as_deref(), Some("50mm weld neck flange"));
        assert_eq!(lines[1].qty, 1);
    }

    #[test]
    fn test_read_bom_csv_defaults_qty() {
        let csv = "part_id\nPIPE-DN50\n";
        let lines = read_bom_csv(csv.as_bytes()).unwrap();
        assert_eq!(lines[0].qty, 1);
    }

    #[test]
    fn test_read_bom_csv_rejects_headerless_columns() {
        let csv = "foo,bar\nx,y\n";
        let err = read_bom_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationFault(_)));
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let csv = "part_id,raw_name,qty\n,,\nPIPE-DN50,,1\n";
        let lines = read_bom_csv(csv.as_bytes()).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_task_yaml_roundtrip() {
        let mut task = AssemblyTask::new(EntityId::new(EntityPrefix::Task), "spool 7");
        task.bom.push(BomLine {
            part_id: Some("PIPE-DN50".to_string()),
            raw_name: None,
            qty: 2,
        });

        let yaml = serde_yml::to_string(&task).unwrap();
        let parsed: AssemblyTask = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.name, "spool 7");
        assert_eq!(parsed.status, TaskStatus::Draft);
        assert_eq!(parsed.bom_quantity(), 2);
    }
}
