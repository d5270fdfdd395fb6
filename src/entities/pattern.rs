//! Assembly patterns - recurring approved pairings learned from reviews
//!
//! A pattern aggregates review outcomes for one (family pair, dn, pn,
//! template) signature. Once its support crosses the configured minimum it
//! acts as a confidence prior for future inference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::entities::part::PartFamily;

/// The normalized signature a pattern aggregates over. Families are kept
/// in sorted order so both directions of a mate share one pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternKey {
    pub family_a: PartFamily,
    pub family_b: PartFamily,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<u32>,

    pub template_id: String,
}

impl PatternKey {
    pub fn new(
        family_a: PartFamily,
        family_b: PartFamily,
        dn: Option<u32>,
        pn: Option<u32>,
        template_id: impl Into<String>,
    ) -> Self {
        let (family_a, family_b) = if family_a <= family_b {
            (family_a, family_b)
        } else {
            (family_b, family_a)
        };
        Self {
            family_a,
            family_b,
            dn,
            pn,
            template_id: template_id.into(),
        }
    }
}

/// A learned assembly pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyPattern {
    pub id: EntityId,
    pub created: DateTime<Utc>,

    pub key: PatternKey,

    /// Total reviews folded in. Never decreases.
    pub support_count: u32,

    #[serde(default)]
    pub approvals: u32,

    #[serde(default)]
    pub rejections: u32,

    /// Set by an explicit validate action, never by support alone
    #[serde(default)]
    pub is_validated: bool,

    pub last_seen: DateTime<Utc>,
}

impl AssemblyPattern {
    /// Confidence multiplier this pattern contributes, in [1.0, 1.15].
    /// Only validated patterns at or above the support minimum contribute;
    /// accumulated support alone never moves confidence.
    pub fn boost(&self, min_support: u32) -> f64 {
        if !self.is_validated || self.support_count < min_support {
            return 1.0;
        }
        let reviewed = self.approvals + self.rejections;
        if reviewed == 0 {
            return 1.0;
        }
        let ratio = f64::from(self.approvals) / f64::from(reviewed);
        1.0 + 0.15 * ratio
    }
}

impl Entity for AssemblyPattern {
    const PREFIX: &'static str = "PTRN";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}
