//! Review records - human verdicts on inferred constraints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::entities::constraint::MateParameters;

/// The verdict a reviewer hands down on a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
    Modify,
}

impl ReviewAction {
    /// Feedback score fed into confidence adjustment
    pub fn score(&self) -> f64 {
        match self {
            ReviewAction::Approve => 1.0,
            ReviewAction::Modify => 0.7,
            ReviewAction::Reject => 0.0,
        }
    }
}

impl std::fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewAction::Approve => write!(f, "approve"),
            ReviewAction::Reject => write!(f, "reject"),
            ReviewAction::Modify => write!(f, "modify"),
        }
    }
}

impl std::str::FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            "modify" => Ok(ReviewAction::Modify),
            _ => Err(format!("Unknown review action: {}", s)),
        }
    }
}

/// A single review of a constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: EntityId,
    pub created: DateTime<Utc>,

    pub constraint_id: EntityId,

    pub action: ReviewAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Replacement parameters when the action is modify
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_parameters: Option<MateParameters>,
}

impl Entity for ReviewRecord {
    const PREFIX: &'static str = "RVW";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}
