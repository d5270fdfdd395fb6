//! Camber: assembly constraint inference and validation engine
//!
//! Infers how piping parts mate (coaxial flange joints, welds, threaded
//! connections) from a BOM plus catalog geometry, validates the result
//! against tolerances, and learns from human review. All records are plain
//! text YAML files under version control.

pub mod cli;
pub mod core;
pub mod engine;
pub mod entities;
