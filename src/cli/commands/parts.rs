//! `camber parts` command - Parts catalog inspection and corpus indexing

use clap::Subcommand;
use console::style;
use miette::Result;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{open_workspace, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::loader;
use crate::engine::matcher::part_vector;
use crate::engine::registry::PartRegistry;

#[derive(Subcommand, Debug)]
pub enum PartsCommands {
    /// List catalog parts
    List(ListArgs),

    /// Show one part in full
    Show(ShowArgs),

    /// Rebuild the name-matching corpus from the catalog
    Index,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by family (pipe, flange, valve, ...)
    #[arg(long, short = 'f')]
    pub family: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Part id
    pub id: String,
}

#[derive(Tabled)]
struct PartRow {
    #[tabled(rename = "PART")]
    part_id: String,
    #[tabled(rename = "FAMILY")]
    family: String,
    #[tabled(rename = "DN")]
    dn: String,
    #[tabled(rename = "PN")]
    pn: String,
    #[tabled(rename = "STD")]
    std: String,
    #[tabled(rename = "PORTS")]
    ports: usize,
}

pub fn run(cmd: PartsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PartsCommands::List(args) => list(args, global),
        PartsCommands::Show(args) => show(args, global),
        PartsCommands::Index => index(global),
    }
}

fn list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let registry = PartRegistry::load(&workspace).map_err(|e| miette::miette!("{}", e))?;

    let rows: Vec<PartRow> = registry
        .iter()
        .filter(|p| {
            args.family
                .as_deref()
                .is_none_or(|f| p.family.to_string() == f.to_lowercase())
        })
        .map(|p| PartRow {
            part_id: truncate_str(&p.part_id, 28),
            family: p.family.to_string(),
            dn: p.dn.map_or_else(|| "-".to_string(), |v| v.to_string()),
            pn: p.pn.map_or_else(|| "-".to_string(), |v| v.to_string()),
            std: p.std.clone().unwrap_or_else(|| "-".to_string()),
            ports: p.ports.len(),
        })
        .collect();

    if rows.is_empty() {
        if !global.quiet {
            println!("No parts in catalog");
        }
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

fn show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let registry = PartRegistry::load(&workspace).map_err(|e| miette::miette!("{}", e))?;
    let part = registry
        .get(&args.id)
        .ok_or_else(|| miette::miette!("part '{}' not in catalog", args.id))?;

    let yaml = serde_yml::to_string(part).map_err(|e| miette::miette!("{}", e))?;
    print!("{}", yaml);
    Ok(())
}

fn index(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let registry = PartRegistry::load(&workspace).map_err(|e| miette::miette!("{}", e))?;

    let corpus_dir = workspace.corpus_dir();
    let mut count = 0;
    for part in registry.iter() {
        let vector = part_vector(part);
        let path = corpus_dir.join(format!("{}.camber.yaml", part.part_id));
        loader::save_entity(&path, &vector)?;
        count += 1;
    }

    if !global.quiet {
        println!(
            "{} Indexed {} parts into {}",
            style("✓").green(),
            count,
            style(corpus_dir.display()).cyan()
        );
    }
    Ok(())
}
