//! Engine error taxonomy
//!
//! Only configuration-level faults abort a task. Missing parts and
//! templates are recorded as orphans, formula failures demote confidence
//! and force review, and solver inconsistencies are structured conflicts
//! in the validation report rather than errors.

use thiserror::Error;

/// Errors surfaced by the inference and validation engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing part or template. Non-fatal to a task: the affected BOM
    /// entity is recorded as unresolved, never silently dropped.
    #[error("not found: {kind} '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// A fastener/tolerance formula failed to evaluate. The owning
    /// constraint keeps confidence 0 and is flagged for mandatory review.
    #[error("formula error in '{expr}': {reason}")]
    Formula { expr: String, reason: String },

    /// Optimistic-concurrency failure on a review action: the constraint's
    /// review status changed since the reviewer last read it. Retryable.
    #[error(
        "stale review for {constraint_id}: status is '{actual}', reviewer expected '{expected}'"
    )]
    StaleReview {
        constraint_id: String,
        expected: String,
        actual: String,
    },

    /// Missing DEFAULT standards row or corrupt template schema. Fatal:
    /// the task aborts since no safe fallback exists.
    #[error("configuration fault: {0}")]
    ConfigurationFault(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(String),
}

impl EngineError {
    /// Convenience constructor for missing parts
    pub fn part_not_found(id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind: "part",
            id: id.into(),
        }
    }

    /// Convenience constructor for missing templates
    pub fn template_not_found(id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind: "template",
            id: id.into(),
        }
    }

    /// Whether this error aborts the whole task
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ConfigurationFault(_) | EngineError::Io(_) | EngineError::Yaml(_)
        )
    }
}
