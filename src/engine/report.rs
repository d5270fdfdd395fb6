//! Validation report generation
//!
//! Runs the validator and the placement solver over a task and folds
//! their output into one durable report, plus a markdown rendering for
//! hand-off outside the workspace.

use chrono::Utc;

use crate::core::workspace::WorkspaceConfig;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::engine::registry::PartRegistry;
use crate::engine::solver::Solver;
use crate::engine::validator::Validator;
use crate::entities::constraint::Constraint;
use crate::entities::report::{CheckCategory, CheckStatus, Conflict, ValidationReport};
use crate::entities::task::AssemblyTask;

pub struct ReportBuilder<'a> {
    pub registry: &'a PartRegistry,
    pub config: &'a WorkspaceConfig,
}

impl ReportBuilder<'_> {
    /// Validate and solve the task, producing a fresh report
    pub fn generate(&self, task: &AssemblyTask, constraints: &[Constraint]) -> ValidationReport {
        let validator = Validator {
            registry: self.registry,
            config: self.config,
        };
        let solver = Solver {
            registry: self.registry,
            config: self.config,
        };

        let checks = validator.validate(task, constraints);
        let solved = solver.solve(task, constraints);

        let overall = ValidationReport::derive_overall(&checks, &solved.conflicts);
        ValidationReport {
            id: EntityId::new(EntityPrefix::Rpt),
            created: Utc::now(),
            task_id: task.id.clone(),
            overall,
            checks,
            conflicts: solved.conflicts,
            placements: solved.placements,
            assembly_sequence: solved.sequence,
        }
    }
}

/// Render a report as markdown
pub fn to_markdown(report: &ValidationReport, task: &AssemblyTask) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Validation report {}\n\n", report.id));
    out.push_str(&format!("- Task: {} ({})\n", task.name, report.task_id));
    out.push_str(&format!("- Generated: {}\n", report.created.to_rfc3339()));
    out.push_str(&format!("- Overall: **{}**\n\n", report.overall));

    for category in CheckCategory::all() {
        let outcomes: Vec<_> = report.category(*category).collect();
        if outcomes.is_empty() {
            continue;
        }
        out.push_str(&format!("## {}\n\n", category));
        for outcome in outcomes {
            let quantity = match (outcome.measured, outcome.bound) {
                (Some(m), Some(b)) => format!(" ({:.3} vs {:.3})", m, b),
                (Some(m), None) => format!(" ({:.3})", m),
                _ => String::new(),
            };
            out.push_str(&format!(
                "- [{}] {}: {}{}\n",
                outcome.status, outcome.rule, outcome.message, quantity
            ));
        }
        out.push('\n');
    }

    if !report.conflicts.is_empty() {
        out.push_str("## Conflicts\n\n");
        for conflict in &report.conflicts {
            match conflict {
                Conflict::OverConstrained {
                    part_id,
                    disagreement_mm,
                    suggestion,
                    ..
                } => out.push_str(&format!(
                    "- over-constrained: {} disagrees by {:.1} mm. {}\n",
                    part_id, disagreement_mm, suggestion
                )),
                Conflict::Collision {
                    part_a,
                    part_b,
                    suggestion,
                } => out.push_str(&format!(
                    "- collision: {} / {}. {}\n",
                    part_a, part_b, suggestion
                )),
                Conflict::Disconnected {
                    part_ids,
                    suggestion,
                } => out.push_str(&format!(
                    "- disconnected: {}. {}\n",
                    part_ids.join(", "),
                    suggestion
                )),
            }
        }
        out.push('\n');
    }

    if !report.assembly_sequence.is_empty() {
        out.push_str("## Suggested assembly sequence\n\n");
        for (step, part_id) in report.assembly_sequence.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", step + 1, part_id));
        }
    }

    out
}

/// Count outcomes by status, for summary lines
pub fn status_counts(report: &ValidationReport) -> (usize, usize, usize) {
    let mut counts = (0, 0, 0);
    for check in &report.checks {
        match check.status {
            CheckStatus::Pass => counts.0 += 1,
            CheckStatus::Warning => counts.1 += 1,
            CheckStatus::Fail => counts.2 += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::part::{Part, PartFamily};
    use crate::entities::task::{BomLine, ResolutionMethod, ResolvedLine};

    fn fixture_task() -> AssemblyTask {
        let mut task = AssemblyTask::new(EntityId::new(EntityPrefix::Task), "spool");
        task.bom.push(BomLine {
            part_id: Some("A".to_string()),
            raw_name: None,
            qty: 1,
        });
        task.resolved.push(ResolvedLine {
            line: 0,
            part_id: "A".to_string(),
            qty: 1,
            method: ResolutionMethod::Direct,
        });
        task
    }

    #[test]
    fn test_generate_rolls_up_conflicts() {
        let registry = PartRegistry::from_parts(vec![Part::new("A", PartFamily::Pipe)]);
        let config = WorkspaceConfig::default();
        let builder = ReportBuilder {
            registry: &registry,
            config: &config,
        };

        // A single unconstrained part fails connectivity
        let report = builder.generate(&fixture_task(), &[]);
        assert_eq!(report.overall, crate::entities::report::ReportStatus::Fail);
        assert!(report
            .checks
            .iter()
            .any(|c| c.rule == "part_connected" && c.status == CheckStatus::Fail));
        assert_eq!(report.assembly_sequence, vec!["A".to_string()]);
    }

    #[test]
    fn test_markdown_rendering() {
        let registry = PartRegistry::from_parts(vec![Part::new("A", PartFamily::Pipe)]);
        let config = WorkspaceConfig::default();
        let builder = ReportBuilder {
            registry: &registry,
            config: &config,
        };
        let task = fixture_task();
        let report = builder.generate(&task, &[]);

        let md = to_markdown(&report, &task);
        assert!(md.contains("# Validation report RPT-"));
        assert!(md.contains("## connectivity"));
        assert!(md.contains("Suggested assembly sequence"));
    }

    #[test]
    fn test_status_counts() {
        let registry = PartRegistry::from_parts(vec![Part::new("A", PartFamily::Pipe)]);
        let config = WorkspaceConfig::default();
        let builder = ReportBuilder {
            registry: &registry,
            config: &config,
        };
        let report = builder.generate(&fixture_task(), &[]);
        let (_, _, fails) = status_counts(&report);
        assert!(fails >= 1);
    }
}
