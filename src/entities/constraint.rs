//! Constraint entity - an inferred mate between two parts
//!
//! Constraints carry fully-resolved parameters (formulas are evaluated at
//! inference time), a confidence score, and an append-only adjustment log
//! fed by the review loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, ReviewStatus};
use crate::core::identity::EntityId;
use crate::entities::template::JoinRule;

/// A mate endpoint: a part and the index of the port used on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MateEndpoint {
    pub part_id: String,

    /// Index into the part's port list; None when the part carries no
    /// usable port geometry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<usize>,
}

/// Resolved mate parameters. Formula-valued template fields are evaluated
/// against the mating parts before the constraint is written.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MateParameters {
    #[serde(default)]
    pub axis_align: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_tol_deg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_tol_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_offset_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_angle_deg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bolt_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bolt_spec: Option<String>,

    /// Pitch circle diameter after formula evaluation, mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcd_mm: Option<f64>,

    #[serde(default)]
    pub gasket: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bolt_material: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gasket_type: Option<String>,
}

/// One confidence adjustment caused by a review action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceAdjustment {
    pub at: DateTime<Utc>,
    pub review_id: EntityId,
    pub from: f64,
    pub to: f64,
    pub action: String,
}

/// An inferred mate constraint between two parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: EntityId,
    pub created: DateTime<Utc>,

    /// The task this constraint was inferred for
    pub task_id: EntityId,

    pub a: MateEndpoint,
    pub b: MateEndpoint,

    /// The template that produced this constraint
    pub template_id: String,

    /// True when the template matched with its A/B roles swapped
    #[serde(default)]
    pub swapped: bool,

    pub join_rule: JoinRule,

    #[serde(default)]
    pub parameters: MateParameters,

    /// Current confidence in [0, 1]
    pub confidence: f64,

    /// Confidence at inference time, before any feedback adjustment
    pub original_confidence: f64,

    /// Human-readable inference trace
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning: Vec<String>,

    #[serde(default)]
    pub review_status: ReviewStatus,

    /// Forced review, e.g. after a formula failure
    #[serde(default)]
    pub review_required: bool,

    /// Append-only log of feedback-driven confidence changes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<ConfidenceAdjustment>,

    /// Set when re-inference replaced this constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<EntityId>,
}

impl Constraint {
    /// The unordered pair key used for deduplication within a task.
    /// Template resolution picks at most one template per part pair, so
    /// one live constraint per pair is the invariant; when re-inference
    /// resolves a different template the old constraint is superseded,
    /// not duplicated.
    pub fn pair_key(&self) -> (String, String) {
        let (x, y) = (&self.a.part_id, &self.b.part_id);
        if x <= y {
            (x.clone(), y.clone())
        } else {
            (y.clone(), x.clone())
        }
    }

    /// Whether this constraint participates in solving at the given floor
    pub fn is_active(&self, pending_floor: f64) -> bool {
        if self.superseded_by.is_some() {
            return false;
        }
        match self.review_status {
            ReviewStatus::Approved => true,
            ReviewStatus::Rejected => false,
            ReviewStatus::Pending => !self.review_required && self.confidence >= pending_floor,
        }
    }
}

impl Entity for Constraint {
    const PREFIX: &'static str = "CON";

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
    use crate::core::identity::EntityPrefix;

    fn constraint(confidence: f64) -> Constraint {
        Constraint {
            id: EntityId::new(EntityPrefix::Con),
            created: Utc::now(),
            task_id: EntityId::new(EntityPrefix::Task),
            a: MateEndpoint {
                part_id: "PIPE-DN50".to_string(),
                port: Some(0),
            },
            b: MateEndpoint {
                part_id: "FLANGE-DN50-PN16-RF".to_string(),
                port: Some(1),
            },
            template_id: "PIPE_FLANGE_DN50_PN16".to_string(),
            swapped: false,
            join_rule: JoinRule::CoaxialPlaneCoincident,
            parameters: MateParameters::default(),
            confidence,
            original_confidence: confidence,
            reasoning: vec!["families pipe/flange matched".to_string()],
            review_status: ReviewStatus::Pending,
            review_required: false,
            adjustments: Vec::new(),
            superseded_by: None,
        }
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let mut c = constraint(0.9);
        let key = c.pair_key();
        std::mem::swap(&mut c.a, &mut c.b);
        assert_eq!(c.pair_key(), key);
    }

    #[test]
    fn test_is_active_respects_floor_and_status() {
        let mut c = constraint(0.85);
        assert!(c.is_active(0.8));
        assert!(!c.is_active(0.9));

        c.review_status = ReviewStatus::Approved;
        assert!(c.is_active(0.9));

        c.review_status = ReviewStatus::Rejected;
        assert!(!c.is_active(0.0));
    }

    #[test]
    fn test_review_required_blocks_pending() {
        let mut c = constraint(0.95);
        c.review_required = true;
        assert!(!c.is_active(0.8));
    }

    #[test]
    fn test_superseded_is_never_active() {
        let mut c = constraint(1.0);
        c.review_status = ReviewStatus::Approved;
        c.superseded_by = Some(EntityId::new(EntityPrefix::Con));
        assert!(!c.is_active(0.0));
    }

    #[test]
    fn test_constraint_yaml_roundtrip() {
        let c = constraint(0.9);
        let yaml = serde_yml::to_string(&c).unwrap();
        let parsed: Constraint = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.id, c.id);
        assert_eq!(parsed.a.part_id, "PIPE-DN50");
        assert_eq!(parsed.review_status, ReviewStatus::Pending);
    }
}
