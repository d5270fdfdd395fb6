//! Core infrastructure: identity, errors, entity loading, workspace layout

pub mod entity;
pub mod error;
pub mod identity;
pub mod loader;
pub mod workspace;
