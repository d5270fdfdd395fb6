//! Validation report entity
//!
//! A report is the durable record of one validation run over a task:
//! per-category check outcomes, solver placements, structured conflicts,
//! and an overall verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::engine::geometry::Vec3;

/// The five check categories a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Connectivity,
    Geometry,
    Fasteners,
    Standards,
    Completeness,
}

impl CheckCategory {
    pub fn all() -> &'static [CheckCategory] {
        &[
            CheckCategory::Connectivity,
            CheckCategory::Geometry,
            CheckCategory::Fasteners,
            CheckCategory::Standards,
            CheckCategory::Completeness,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckCategory::Connectivity => "connectivity",
            CheckCategory::Geometry => "geometry",
            CheckCategory::Fasteners => "fasteners",
            CheckCategory::Standards => "standards",
            CheckCategory::Completeness => "completeness",
        }
    }
}

impl std::fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a single check outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "pass"),
            CheckStatus::Warning => write!(f, "warning"),
            CheckStatus::Fail => write!(f, "fail"),
        }
    }
}

/// One check result. Quantitative checks carry the measured value and the
/// bound it was compared against so a reviewer can judge how close the
/// call was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub category: CheckCategory,
    pub status: CheckStatus,

    /// Short rule identifier, e.g. "port_axis_alignment"
    pub rule: String,

    /// Parts or constraints this outcome concerns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<f64>,

    pub message: String,
}

/// A structured solver conflict
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Conflict {
    /// Two constraints demand incompatible poses for one part
    OverConstrained {
        part_id: String,
        constraint_ids: Vec<EntityId>,
        disagreement_mm: f64,
        suggestion: String,
    },
    /// Two placed parts intersect
    Collision {
        part_a: String,
        part_b: String,
        suggestion: String,
    },
    /// Parts with no accepted constraint binding them to the assembly
    Disconnected {
        part_ids: Vec<String>,
        suggestion: String,
    },
}

/// A solved part pose (translation only; orientation comes from the
/// part's local frame)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub part_id: String,
    pub offset: Vec3,
}

/// Overall report verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Warning,
    Fail,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Pass => write!(f, "pass"),
            ReportStatus::Warning => write!(f, "warning"),
            ReportStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Validation report for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub id: EntityId,
    pub created: DateTime<Utc>,

    pub task_id: EntityId,

    pub overall: ReportStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckOutcome>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<Conflict>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placements: Vec<Placement>,

    /// Suggested build order from the solver's traversal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assembly_sequence: Vec<String>,
}

impl ValidationReport {
    /// Derive the overall verdict: any fail or conflict fails the report,
    /// any warning downgrades a pass.
    pub fn derive_overall(checks: &[CheckOutcome], conflicts: &[Conflict]) -> ReportStatus {
        if !conflicts.is_empty() || checks.iter().any(|c| c.status == CheckStatus::Fail) {
            ReportStatus::Fail
        } else if checks.iter().any(|c| c.status == CheckStatus::Warning) {
            ReportStatus::Warning
        } else {
            ReportStatus::Pass
        }
    }

    /// Outcomes in one category
    pub fn category(&self, category: CheckCategory) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(move |c| c.category == category)
    }
}

impl Entity for ValidationReport {
    const PREFIX: &'static str = "RPT";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: CheckStatus) -> CheckOutcome {
        CheckOutcome {
            category: CheckCategory::Geometry,
            status,
            rule: "port_axis_alignment".to_string(),
            subjects: vec!["PIPE-DN50".to_string()],
            measured: Some(1.2),
            bound: Some(2.0),
            message: "axis deviation 1.2 deg within 2.0 deg".to_string(),
        }
    }

    #[test]
    fn test_overall_pass_warning_fail() {
        assert_eq!(
            ValidationReport::derive_overall(&[outcome(CheckStatus::Pass)], &[]),
            ReportStatus::Pass
        );
        assert_eq!(
            ValidationReport::derive_overall(
                &[outcome(CheckStatus::Pass), outcome(CheckStatus::Warning)],
                &[]
            ),
            ReportStatus::Warning
        );
        assert_eq!(
            ValidationReport::derive_overall(&[outcome(CheckStatus::Fail)], &[]),
            ReportStatus::Fail
        );
    }

    #[test]
    fn test_any_conflict_fails_overall() {
        let conflict = Conflict::Disconnected {
            part_ids: vec!["GASKET-DN50".to_string()],
            suggestion: "no accepted constraint references these parts".to_string(),
        };
        assert_eq!(
            ValidationReport::derive_overall(&[outcome(CheckStatus::Pass)], &[conflict]),
            ReportStatus::Fail
        );
    }
}
