//! Command implementations

pub mod infer;
pub mod init;
pub mod parts;
pub mod pattern;
pub mod report;
pub mod review;
pub mod task;
