//! `camber pattern` command - Learned assembly pattern management

use clap::Subcommand;
use console::style;
use miette::Result;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{format_short_id, load_patterns, open_workspace};
use crate::cli::GlobalOpts;
use crate::core::loader;
use crate::engine::feedback::validate_pattern;

#[derive(Subcommand, Debug)]
pub enum PatternCommands {
    /// List learned patterns
    List,

    /// Mark a pattern as validated
    Validate(ValidateArgs),
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Pattern id (full or prefix)
    pub id: String,
}

#[derive(Tabled)]
struct PatternRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "FAMILIES")]
    families: String,
    #[tabled(rename = "TEMPLATE")]
    template: String,
    #[tabled(rename = "SUPPORT")]
    support: u32,
    #[tabled(rename = "APPROVE/REJECT")]
    votes: String,
    #[tabled(rename = "VALIDATED")]
    validated: String,
}

pub fn run(cmd: PatternCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PatternCommands::List => list(global),
        PatternCommands::Validate(args) => validate(args, global),
    }
}

fn list(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let patterns = load_patterns(&workspace)?;

    if patterns.is_empty() {
        if !global.quiet {
            println!("No learned patterns yet");
        }
        return Ok(());
    }

    let rows: Vec<PatternRow> = patterns
        .iter()
        .map(|p| PatternRow {
            id: format_short_id(&p.id),
            families: format!("{}/{}", p.key.family_a, p.key.family_b),
            template: p.key.template_id.clone(),
            support: p.support_count,
            votes: format!("{}/{}", p.approvals, p.rejections),
            validated: if p.is_validated { "yes" } else { "" }.to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

fn validate(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let mut patterns = load_patterns(&workspace)?;
    let pattern = patterns
        .iter_mut()
        .find(|p| p.id.to_string().starts_with(&args.id))
        .ok_or_else(|| miette::miette!("pattern '{}' not found", args.id))?;

    validate_pattern(pattern);
    loader::save_entity(&workspace.entity_path(&pattern.id), pattern)?;

    if !global.quiet {
        println!(
            "{} Validated pattern {}",
            style("✓").green(),
            style(&pattern.id).cyan()
        );
    }
    Ok(())
}
