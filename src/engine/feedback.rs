//! Feedback learning loop
//!
//! Review actions feed back into the engine two ways: the reviewed
//! constraint's confidence moves toward the review score by the
//! configured weight, and the (family pair, size, template) pattern
//! accumulates support so future inference starts from a better prior.
//!
//! Review writes are guarded by optimistic concurrency: the caller
//! states the status it reviewed against, and a mismatch is a stale
//! review error rather than a silent overwrite.

use chrono::Utc;

use crate::core::entity::ReviewStatus;
use crate::core::error::EngineError;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workspace::WorkspaceConfig;
use crate::engine::registry::PartRegistry;
use crate::entities::constraint::{ConfidenceAdjustment, Constraint};
use crate::entities::pattern::{AssemblyPattern, PatternKey};
use crate::entities::review::{ReviewAction, ReviewRecord};

/// One review submission
#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub action: ReviewAction,

    /// The status the reviewer saw; a mismatch means someone else
    /// reviewed first
    pub expected: ReviewStatus,

    pub reviewer: Option<String>,
    pub notes: Option<String>,

    /// Replacement parameters, required for modify
    pub modified_parameters: Option<crate::entities::constraint::MateParameters>,
}

pub struct FeedbackLoop<'a> {
    pub registry: &'a PartRegistry,
    pub config: &'a WorkspaceConfig,
}

impl FeedbackLoop<'_> {
    /// Apply a review to a constraint and fold it into the pattern store.
    /// Returns None for an idempotent re-approval; otherwise the review
    /// record to persist.
    pub fn submit(
        &self,
        constraint: &mut Constraint,
        input: ReviewInput,
        patterns: &mut Vec<AssemblyPattern>,
    ) -> Result<Option<ReviewRecord>, EngineError> {
        // Re-approving an approved constraint is a no-op, not an error
        // and not a second pattern vote
        if input.action == ReviewAction::Approve
            && constraint.review_status == ReviewStatus::Approved
        {
            return Ok(None);
        }

        if constraint.review_status != input.expected {
            return Err(EngineError::StaleReview {
                constraint_id: constraint.id.to_string(),
                expected: input.expected.to_string(),
                actual: constraint.review_status.to_string(),
            });
        }

        let review = ReviewRecord {
            id: EntityId::new(EntityPrefix::Rvw),
            created: Utc::now(),
            constraint_id: constraint.id.clone(),
            action: input.action,
            reviewer: input.reviewer,
            notes: input.notes,
            modified_parameters: input.modified_parameters.clone(),
        };

        // Weighted pull toward the review score
        let weight = self.config.pattern.feedback_weight;
        let from = constraint.confidence;
        let to = (from * (1.0 - weight) + input.action.score() * weight).clamp(0.0, 1.0);
        constraint.confidence = to;
        constraint.adjustments.push(ConfidenceAdjustment {
            at: review.created,
            review_id: review.id.clone(),
            from,
            to,
            action: input.action.to_string(),
        });

        constraint.review_status = match input.action {
            ReviewAction::Approve | ReviewAction::Modify => ReviewStatus::Approved,
            ReviewAction::Reject => ReviewStatus::Rejected,
        };
        constraint.review_required = false;
        if input.action == ReviewAction::Modify {
            if let Some(parameters) = input.modified_parameters {
                constraint.parameters = parameters;
            }
        }

        self.upsert_pattern(constraint, input.action, patterns);
        Ok(Some(review))
    }

    /// Record the review against its pattern, creating one on first sight
    fn upsert_pattern(
        &self,
        constraint: &Constraint,
        action: ReviewAction,
        patterns: &mut Vec<AssemblyPattern>,
    ) {
        let Some(key) = self.pattern_key(constraint) else {
            return;
        };
        let now = Utc::now();

        let idx = match patterns.iter().position(|p| p.key == key) {
            Some(idx) => idx,
            None => {
                patterns.push(AssemblyPattern {
                    id: EntityId::new(EntityPrefix::Ptrn),
                    created: now,
                    key,
                    support_count: 0,
                    approvals: 0,
                    rejections: 0,
                    is_validated: false,
                    last_seen: now,
                });
                patterns.len() - 1
            }
        };
        let pattern = &mut patterns[idx];

        pattern.support_count += 1;
        match action {
            ReviewAction::Approve | ReviewAction::Modify => pattern.approvals += 1,
            ReviewAction::Reject => pattern.rejections += 1,
        }
        pattern.last_seen = now;
    }

    fn pattern_key(&self, constraint: &Constraint) -> Option<PatternKey> {
        let part_a = self.registry.get(&constraint.a.part_id)?;
        let part_b = self.registry.get(&constraint.b.part_id)?;
        let dn = part_a.dn.or(part_b.dn);
        let pn = part_a.pn.or(part_b.pn);
        Some(PatternKey::new(
            part_a.family,
            part_b.family,
            dn,
            pn,
            &constraint.template_id,
        ))
    }
}

/// Mark a pattern validated. Validation is an explicit curator action;
/// support alone never sets it.
pub fn validate_pattern(pattern: &mut AssemblyPattern) {
    pattern.is_validated = true;
    pattern.last_seen = Utc::now();
}
