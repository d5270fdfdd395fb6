//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    infer::InferArgs,
    init::InitArgs,
    parts::PartsCommands,
    pattern::PatternCommands,
    report::ReportCommands,
    review::ReviewCommands,
    task::TaskCommands,
};

#[derive(Parser)]
#[command(name = "camber")]
#[command(author, version, about = "Assembly constraint inference and validation")]
#[command(
    long_about = "Infers mate constraints for piping assemblies from a parts catalog and \
connection templates, validates the result geometrically, and learns from review feedback. \
All state lives in plain-text YAML files under the workspace."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Workspace root (default: auto-detect by finding .camber/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new camber workspace
    Init(InitArgs),

    /// Parts catalog inspection and corpus indexing
    #[command(subcommand)]
    Parts(PartsCommands),

    /// Assembly task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Infer mate constraints for a task
    Infer(InferArgs),

    /// Review inferred constraints
    #[command(subcommand)]
    Review(ReviewCommands),

    /// Validation report generation
    #[command(subcommand)]
    Report(ReportCommands),

    /// Learned assembly pattern management
    #[command(subcommand)]
    Pattern(PatternCommands),
}
