//! `camber infer` command - Run constraint inference for a task

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{
    format_short_id, load_patterns, load_task, load_task_constraints, open_workspace,
};
use crate::cli::GlobalOpts;
use crate::core::loader;
use crate::core::workspace::Workspace;
use crate::engine::inference::InferenceEngine;
use crate::engine::matcher::{self, NameMatcher};
use crate::engine::registry::PartRegistry;
use crate::engine::templates::TemplateLibrary;
use crate::entities::name_vector::PartNameVector;
use crate::entities::standards::StandardsTable;
use crate::entities::task::{AssemblyTask, ResolutionMethod};

#[derive(clap::Args, Debug)]
pub struct InferArgs {
    /// Task id (full or prefix)
    pub task_id: String,
}

#[derive(Tabled)]
struct ConstraintRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "A")]
    a: String,
    #[tabled(rename = "B")]
    b: String,
    #[tabled(rename = "TEMPLATE")]
    template: String,
    #[tabled(rename = "CONF")]
    confidence: String,
    #[tabled(rename = "REVIEW")]
    review: String,
}

pub fn run(args: InferArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let (task_path, mut task) = load_task(&workspace, &args.task_id)?;

    let registry = PartRegistry::load(&workspace).map_err(|e| miette::miette!("{}", e))?;
    let library = TemplateLibrary::load(&workspace).map_err(|e| miette::miette!("{}", e))?;
    let standards =
        StandardsTable::load(&workspace.standards_path()).map_err(|e| miette::miette!("{}", e))?;
    let patterns = load_patterns(&workspace)?;
    let matcher = build_matcher(&workspace, &registry)?;

    let config = workspace.config();
    let engine = InferenceEngine {
        registry: &registry,
        library: &library,
        standards: &standards,
        patterns: &patterns,
        matcher: &matcher,
        config: &config,
    };

    let mut existing = load_task_constraints(&workspace, &task)?;
    let outcome = engine
        .run(&mut task, &mut existing)
        .map_err(|e| miette::miette!("{}", e))?;

    // Persist superseded constraints alongside the fresh ones
    for constraint in existing.iter().filter(|c| c.superseded_by.is_some()) {
        loader::save_entity(&workspace.entity_path(&constraint.id), constraint)?;
    }
    for constraint in &outcome.constraints {
        loader::save_entity(&workspace.entity_path(&constraint.id), constraint)?;
    }
    loader::save_entity(&task_path, &task)?;
    record_corpus_hits(&workspace, &task)?;

    if global.quiet {
        return Ok(());
    }

    println!(
        "{} Inferred {} constraints for {} ({} resolved, {} orphans)",
        style("✓").green(),
        outcome.constraints.len(),
        style(&task.id).cyan(),
        task.resolved.len(),
        task.orphans.len()
    );
    if !outcome.superseded.is_empty() {
        println!("  superseded {} earlier constraints", outcome.superseded.len());
    }
    if !outcome.kept_approved.is_empty() {
        println!(
            "  kept {} approved constraints untouched",
            outcome.kept_approved.len()
        );
    }
    if !outcome.kept_rejected.is_empty() {
        println!(
            "  suppressed {} pairs rejected in review",
            outcome.kept_rejected.len()
        );
    }
    for (a, b) in &outcome.unmatched {
        println!(
            "  {} no template covers {} / {}",
            style("!").yellow(),
            a,
            b
        );
    }
    for orphan in &task.orphans {
        println!(
            "  {} line {}: {} ({})",
            style("!").yellow(),
            orphan.line,
            orphan.label,
            orphan.reason
        );
    }

    if !outcome.constraints.is_empty() {
        let rows: Vec<ConstraintRow> = outcome
            .constraints
            .iter()
            .map(|c| ConstraintRow {
                id: format_short_id(&c.id),
                a: c.a.part_id.clone(),
                b: c.b.part_id.clone(),
                template: c.template_id.clone(),
                confidence: format!("{:.2}", c.confidence),
                review: if c.review_required {
                    "required".to_string()
                } else {
                    c.review_status.to_string()
                },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }
    Ok(())
}

/// Insert or bump a corpus record for each free-text name the matcher
/// resolved this run. New names enter with a count of one; repeat
/// sightings increment. The next snapshot rebuild picks the records up.
fn record_corpus_hits(workspace: &Workspace, task: &AssemblyTask) -> Result<()> {
    let corpus_dir = workspace.corpus_dir();
    for line in &task.resolved {
        if !matches!(line.method, ResolutionMethod::Matched { .. }) {
            continue;
        }
        let Some(raw_name) = task.bom.get(line.line).and_then(|b| b.raw_name.as_deref()) else {
            continue;
        };
        let vector = matcher::observed_vector(raw_name, &line.part_id);
        if vector.tokens.is_empty() {
            continue;
        }
        let path = corpus_dir.join(format!("{}.camber.yaml", vector.tokens.join("-")));
        if path.exists() {
            let content = std::fs::read_to_string(&path).into_diagnostic()?;
            let mut existing: PartNameVector = serde_yml::from_str(&content).into_diagnostic()?;
            existing.occurrence_count += 1;
            loader::save_entity(&path, &existing)?;
        } else {
            loader::save_entity(&path, &vector)?;
        }
    }
    Ok(())
}

/// Build the matcher from the corpus, filling in any catalog part the
/// index command has not written yet so un-indexed workspaces still
/// resolve names
fn build_matcher(workspace: &Workspace, registry: &PartRegistry) -> Result<NameMatcher> {
    let config = workspace.config();
    let matcher = NameMatcher::new(&config.matcher);
    let mut vectors: Vec<PartNameVector> = loader::load_all(&workspace.corpus_dir())?;
    for part in registry.iter() {
        if !vectors
            .iter()
            .any(|v| v.raw_name.is_none() && v.part_id == part.part_id)
        {
            vectors.push(matcher::part_vector(part));
        }
    }
    matcher.rebuild(vectors);
    Ok(matcher)
}
