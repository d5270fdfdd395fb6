//! `camber report` command - Validation report generation

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{
    format_short_id, load_task, load_task_constraints, open_workspace,
};
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::engine::registry::PartRegistry;
use crate::engine::report::{status_counts, to_markdown, ReportBuilder};
use crate::entities::report::ValidationReport;

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Validate a task and write a new report
    Generate(GenerateArgs),

    /// List saved reports
    List,
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Task id (full or prefix)
    pub task_id: String,

    /// Also write a markdown rendering to this path
    #[arg(long, short = 'o')]
    pub output: Option<std::path::PathBuf>,
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TASK")]
    task: String,
    #[tabled(rename = "OVERALL")]
    overall: String,
    #[tabled(rename = "CHECKS")]
    checks: usize,
    #[tabled(rename = "CONFLICTS")]
    conflicts: usize,
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::Generate(args) => generate(args, global),
        ReportCommands::List => list(global),
    }
}

fn generate(args: GenerateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let (_, task) = load_task(&workspace, &args.task_id)?;
    let constraints = load_task_constraints(&workspace, &task)?;
    let registry = PartRegistry::load(&workspace).map_err(|e| miette::miette!("{}", e))?;
    let config = workspace.config();

    let builder = ReportBuilder {
        registry: &registry,
        config: &config,
    };
    let report = builder.generate(&task, &constraints);

    loader::save_entity(&workspace.entity_path(&report.id), &report)?;
    if let Some(output) = &args.output {
        std::fs::write(output, to_markdown(&report, &task)).into_diagnostic()?;
    }

    if global.quiet {
        return Ok(());
    }

    let overall = match report.overall {
        crate::entities::report::ReportStatus::Pass => style("pass").green(),
        crate::entities::report::ReportStatus::Warning => style("warning").yellow(),
        crate::entities::report::ReportStatus::Fail => style("fail").red(),
    };
    let (passes, warnings, fails) = status_counts(&report);
    println!(
        "{} Report {} for {}: {} ({} pass / {} warning / {} fail, {} conflicts)",
        style("✓").green(),
        style(&report.id).cyan(),
        task.name,
        overall,
        passes,
        warnings,
        fails,
        report.conflicts.len()
    );
    if let Some(output) = &args.output {
        println!("  wrote {}", style(output.display()).cyan());
    }

    // Which templates carried the assembly
    let mut usage: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for constraint in constraints
        .iter()
        .filter(|c| c.is_active(config.solver.pending_floor))
    {
        *usage.entry(constraint.template_id.as_str()).or_insert(0) += 1;
    }
    if !usage.is_empty() {
        println!("  templates in use:");
        for (template_id, count) in usage {
            println!("    {} × {}", count, template_id);
        }
    }
    Ok(())
}

fn list(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let reports: Vec<ValidationReport> =
        loader::load_all(&workspace.entity_dir(EntityPrefix::Rpt))?;

    if reports.is_empty() {
        if !global.quiet {
            println!("No reports");
        }
        return Ok(());
    }

    let rows: Vec<ReportRow> = reports
        .iter()
        .map(|r| ReportRow {
            id: format_short_id(&r.id),
            task: format_short_id(&r.task_id),
            overall: r.overall.to_string(),
            checks: r.checks.len(),
            conflicts: r.conflicts.len(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}
