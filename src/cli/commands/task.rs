//! `camber task` command - Assembly task management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{format_short_id, load_task, open_workspace, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader;
use crate::entities::task::{read_bom_csv, AssemblyTask};

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task from a BOM CSV
    New(NewArgs),

    /// List tasks
    List,

    /// Show one task in full
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Task name
    #[arg(long, short = 'n')]
    pub name: String,

    /// BOM CSV with part_id,raw_name,qty columns
    #[arg(long)]
    pub bom: std::path::PathBuf,

    /// Line class for standards resolution
    #[arg(long = "line-class")]
    pub line_class: Option<String>,

    /// Project scope for standards resolution
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Task id (full or prefix)
    pub id: String,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "BOM")]
    bom: usize,
    #[tabled(rename = "ORPHANS")]
    orphans: usize,
    #[tabled(rename = "CONSTRAINTS")]
    constraints: usize,
}

pub fn run(cmd: TaskCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TaskCommands::New(args) => new(args, global),
        TaskCommands::List => list(global),
        TaskCommands::Show(args) => show(args, global),
    }
}

fn new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;

    let file = File::open(&args.bom).into_diagnostic()?;
    let bom = read_bom_csv(file).map_err(|e| miette::miette!("{}", e))?;
    if bom.is_empty() {
        miette::bail!("BOM '{}' has no usable lines", args.bom.display());
    }

    let mut task = AssemblyTask::new(EntityId::new(EntityPrefix::Task), &args.name);
    task.bom = bom;
    task.line_class = args.line_class;
    task.project_id = args.project;

    let path = workspace.entity_path(&task.id);
    loader::save_entity(&path, &task)?;

    if !global.quiet {
        println!(
            "{} Created task {} with {} BOM lines",
            style("✓").green(),
            style(&task.id).cyan(),
            task.bom.len()
        );
        println!("  Next: {}", style(format!("camber infer {}", task.id)).yellow());
    }
    Ok(())
}

fn list(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let tasks: Vec<AssemblyTask> =
        loader::load_all(&workspace.entity_dir(EntityPrefix::Task))?;

    if tasks.is_empty() {
        if !global.quiet {
            println!("No tasks");
        }
        return Ok(());
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .map(|t| TaskRow {
            id: format_short_id(&t.id),
            name: truncate_str(&t.name, 24),
            status: t.status.to_string(),
            bom: t.bom.len(),
            orphans: t.orphans.len(),
            constraints: t.constraint_ids.len(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

fn show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let (_, task) = load_task(&workspace, &args.id)?;

    let yaml = serde_yml::to_string(&task).map_err(|e| miette::miette!("{}", e))?;
    print!("{}", yaml);
    Ok(())
}
