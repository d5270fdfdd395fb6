//! Entity definitions for camber records
//!
//! Catalog records (parts, templates, standards) keep human-assigned ids;
//! everything the engine writes carries a prefixed ULID and implements
//! the Entity trait.

pub mod constraint;
pub mod name_vector;
pub mod part;
pub mod pattern;
pub mod report;
pub mod review;
pub mod standards;
pub mod task;
pub mod template;

pub use constraint::{ConfidenceAdjustment, Constraint, MateEndpoint, MateParameters};
pub use name_vector::PartNameVector;
pub use part::{EndType, FaceType, GeomFingerprint, Part, PartFamily, Port, PortType};
pub use pattern::{AssemblyPattern, PatternKey};
pub use report::{
    CheckCategory, CheckOutcome, CheckStatus, Conflict, Placement, ReportStatus, ValidationReport,
};
pub use review::{ReviewAction, ReviewRecord};
pub use standards::{StandardsMapping, StandardsRow, StandardsTable};
pub use task::{AssemblyTask, BomLine, OrphanLine, ResolutionMethod, ResolvedLine, TaskStatus};
pub use template::{ConnectionTemplate, FastenerSpec, JoinRule, MateSchema, NumericSpec};
