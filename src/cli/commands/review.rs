//! `camber review` command - Review inferred constraints

use clap::Subcommand;
use console::style;
use miette::Result;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{
    format_short_id, load_constraint, load_patterns, open_workspace,
};
use crate::cli::GlobalOpts;
use crate::core::entity::ReviewStatus;
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::engine::feedback::{FeedbackLoop, ReviewInput};
use crate::engine::registry::PartRegistry;
use crate::entities::constraint::Constraint;
use crate::entities::review::ReviewAction;

#[derive(Subcommand, Debug)]
pub enum ReviewCommands {
    /// List constraints awaiting review
    List,

    /// Approve a constraint
    Approve(ActionArgs),

    /// Reject a constraint
    Reject(ActionArgs),

    /// Approve a constraint with modified parameters
    Modify(ModifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct ActionArgs {
    /// Constraint id (full or prefix)
    pub id: String,

    /// The status you reviewed against; a mismatch aborts the review
    #[arg(long, default_value = "pending")]
    pub expect: String,

    #[arg(long)]
    pub reviewer: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ModifyArgs {
    #[command(flatten)]
    pub action: ActionArgs,

    /// Replacement bolt count
    #[arg(long)]
    pub bolt_count: Option<u32>,

    /// Replacement bolt spec, e.g. M20
    #[arg(long)]
    pub bolt_spec: Option<String>,

    /// Replacement pitch circle diameter, mm
    #[arg(long)]
    pub pcd_mm: Option<f64>,
}

#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "A")]
    a: String,
    #[tabled(rename = "B")]
    b: String,
    #[tabled(rename = "CONF")]
    confidence: String,
    #[tabled(rename = "FORCED")]
    forced: String,
}

pub fn run(cmd: ReviewCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReviewCommands::List => list(global),
        ReviewCommands::Approve(args) => act(args, ReviewAction::Approve, None, global),
        ReviewCommands::Reject(args) => act(args, ReviewAction::Reject, None, global),
        ReviewCommands::Modify(args) => {
            let ModifyArgs {
                action,
                bolt_count,
                bolt_spec,
                pcd_mm,
            } = args;
            act(
                action,
                ReviewAction::Modify,
                Some((bolt_count, bolt_spec, pcd_mm)),
                global,
            )
        }
    }
}

fn list(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let constraints: Vec<Constraint> =
        loader::load_all(&workspace.entity_dir(EntityPrefix::Con))?;

    let rows: Vec<PendingRow> = constraints
        .iter()
        .filter(|c| c.superseded_by.is_none() && c.review_status == ReviewStatus::Pending)
        .map(|c| PendingRow {
            id: format_short_id(&c.id),
            a: c.a.part_id.clone(),
            b: c.b.part_id.clone(),
            confidence: format!("{:.2}", c.confidence),
            forced: if c.review_required { "yes" } else { "" }.to_string(),
        })
        .collect();

    if rows.is_empty() {
        if !global.quiet {
            println!("Nothing awaiting review");
        }
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

fn act(
    args: ActionArgs,
    action: ReviewAction,
    modifications: Option<(Option<u32>, Option<String>, Option<f64>)>,
    global: &GlobalOpts,
) -> Result<()> {
    let workspace = open_workspace(global)?;
    let (path, mut constraint) = load_constraint(&workspace, &args.id)?;
    let registry = PartRegistry::load(&workspace).map_err(|e| miette::miette!("{}", e))?;
    let config = workspace.config();
    let mut patterns = load_patterns(&workspace)?;

    let expected: ReviewStatus = args
        .expect
        .parse()
        .map_err(|e| miette::miette!("{}", e))?;

    let modified_parameters = modifications.map(|(bolt_count, bolt_spec, pcd_mm)| {
        let mut parameters = constraint.parameters.clone();
        if bolt_count.is_some() {
            parameters.bolt_count = bolt_count;
        }
        if bolt_spec.is_some() {
            parameters.bolt_spec = bolt_spec;
        }
        if pcd_mm.is_some() {
            parameters.pcd_mm = pcd_mm;
        }
        parameters
    });

    let feedback = FeedbackLoop {
        registry: &registry,
        config: &config,
    };
    let input = ReviewInput {
        action,
        expected,
        reviewer: args.reviewer,
        notes: args.notes,
        modified_parameters,
    };

    let review = feedback
        .submit(&mut constraint, input, &mut patterns)
        .map_err(|e| miette::miette!("{}", e))?;

    let Some(review) = review else {
        if !global.quiet {
            println!(
                "{} {} is already approved; nothing to do",
                style("✓").green(),
                style(&constraint.id).cyan()
            );
        }
        return Ok(());
    };

    loader::save_entity(&path, &constraint)?;
    loader::save_entity(&workspace.entity_path(&review.id), &review)?;
    for pattern in &patterns {
        loader::save_entity(&workspace.entity_path(&pattern.id), pattern)?;
    }

    if !global.quiet {
        println!(
            "{} {} {} (confidence {:.2} -> {:.2})",
            style("✓").green(),
            action,
            style(&constraint.id).cyan(),
            constraint.adjustments.last().map_or(0.0, |a| a.from),
            constraint.confidence
        );
    }
    Ok(())
}
