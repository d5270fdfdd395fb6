//! The inference and validation engine
//!
//! Pure logic over loaded catalog and task state. Persistence stays in
//! the CLI layer; every module here works on in-memory values so it can
//! be tested without a workspace.

pub mod feedback;
pub mod formula;
pub mod geometry;
pub mod inference;
pub mod matcher;
pub mod registry;
pub mod report;
pub mod solver;
pub mod templates;
pub mod validator;

pub use feedback::{FeedbackLoop, ReviewInput};
pub use inference::{InferenceEngine, InferenceOutcome};
pub use matcher::NameMatcher;
pub use registry::PartRegistry;
pub use report::ReportBuilder;
pub use solver::{SolveResult, Solver};
pub use templates::{TemplateLibrary, TemplateMatch};
pub use validator::Validator;
