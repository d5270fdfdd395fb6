//! Geometric and completeness validation
//!
//! Runs the five check categories over a task and its constraints.
//! Quantitative checks grade on a shared policy: within the bound is a
//! pass, within twice the bound is a warning, beyond that a fail. Every
//! quantitative outcome records the measured value and the bound so near
//! misses are visible in the report.

use crate::core::workspace::WorkspaceConfig;
use crate::engine::geometry::antiparallel_deviation_deg;
use crate::engine::registry::PartRegistry;
use crate::entities::constraint::Constraint;
use crate::entities::part::Port;
use crate::entities::report::{CheckCategory, CheckOutcome, CheckStatus};
use crate::entities::task::AssemblyTask;
use crate::entities::template::JoinRule;

/// Grade a measured value against its bound
pub fn grade(measured: f64, bound: f64) -> CheckStatus {
    if measured <= bound {
        CheckStatus::Pass
    } else if measured <= 2.0 * bound {
        CheckStatus::Warning
    } else {
        CheckStatus::Fail
    }
}

pub struct Validator<'a> {
    pub registry: &'a PartRegistry,
    pub config: &'a WorkspaceConfig,
}

impl Validator<'_> {
    /// Run every check category over the task's active constraints
    pub fn validate(&self, task: &AssemblyTask, constraints: &[Constraint]) -> Vec<CheckOutcome> {
        let active: Vec<&Constraint> = constraints
            .iter()
            .filter(|c| c.is_active(self.config.solver.pending_floor))
            .collect();

        let mut outcomes = Vec::new();
        self.check_connectivity(task, &active, &mut outcomes);
        self.check_geometry(&active, &mut outcomes);
        self.check_fasteners(&active, &mut outcomes);
        self.check_standards(&active, &mut outcomes);
        self.check_completeness(task, constraints, &mut outcomes);
        outcomes
    }

    fn port<'p>(&'p self, part_id: &str, port: Option<usize>) -> Option<&'p Port> {
        self.registry.get(part_id)?.ports.get(port?)
    }

    fn check_connectivity(
        &self,
        task: &AssemblyTask,
        active: &[&Constraint],
        outcomes: &mut Vec<CheckOutcome>,
    ) {
        for line in &task.resolved {
            let covered = active
                .iter()
                .any(|c| c.a.part_id == line.part_id || c.b.part_id == line.part_id);
            outcomes.push(CheckOutcome {
                category: CheckCategory::Connectivity,
                status: if covered {
                    CheckStatus::Pass
                } else {
                    CheckStatus::Fail
                },
                rule: "part_connected".to_string(),
                subjects: vec![line.part_id.clone()],
                measured: None,
                bound: None,
                message: if covered {
                    format!("{} participates in at least one constraint", line.part_id)
                } else {
                    format!("{} has no accepted constraint", line.part_id)
                },
            });
        }
    }

    fn check_geometry(&self, active: &[&Constraint], outcomes: &mut Vec<CheckOutcome>) {
        for constraint in active {
            match constraint.join_rule {
                JoinRule::Welded => self.check_weld_prep(constraint, outcomes),
                JoinRule::Threaded => self.check_thread_compat(constraint, outcomes),
                JoinRule::CoaxialPlaneCoincident => {}
            }
            if !constraint.parameters.axis_align {
                continue;
            }
            let subjects = vec![
                constraint.a.part_id.clone(),
                constraint.b.part_id.clone(),
            ];
            let (Some(port_a), Some(port_b)) = (
                self.port(&constraint.a.part_id, constraint.a.port),
                self.port(&constraint.b.part_id, constraint.b.port),
            ) else {
                outcomes.push(CheckOutcome {
                    category: CheckCategory::Geometry,
                    status: CheckStatus::Warning,
                    rule: "port_axis_alignment".to_string(),
                    subjects,
                    measured: None,
                    bound: constraint.parameters.angle_tol_deg,
                    message: "axis alignment required but port geometry is missing".to_string(),
                });
                continue;
            };

            if let Some(angle_tol) = constraint.parameters.angle_tol_deg {
                let deviation = antiparallel_deviation_deg(&port_a.axis, &port_b.axis);
                outcomes.push(CheckOutcome {
                    category: CheckCategory::Geometry,
                    status: grade(deviation, angle_tol),
                    rule: "port_axis_alignment".to_string(),
                    subjects: subjects.clone(),
                    measured: Some(deviation),
                    bound: Some(angle_tol),
                    message: format!(
                        "axis deviation {:.2} deg against tolerance {:.2} deg",
                        deviation, angle_tol
                    ),
                });
            }

            if let Some(gap_tol) = constraint.parameters.gap_tol_mm {
                let nominal = constraint.parameters.face_offset_mm.unwrap_or(0.0);
                let gap = (port_a.origin.distance(&port_b.origin) - nominal).abs();
                outcomes.push(CheckOutcome {
                    category: CheckCategory::Geometry,
                    status: grade(gap, gap_tol),
                    rule: "face_gap".to_string(),
                    subjects,
                    measured: Some(gap),
                    bound: Some(gap_tol),
                    message: format!(
                        "face gap {:.3} mm against tolerance {:.3} mm",
                        gap, gap_tol
                    ),
                });
            }
        }
    }

    /// Weld prep angle must be present and within the workable range
    fn check_weld_prep(&self, constraint: &Constraint, outcomes: &mut Vec<CheckOutcome>) {
        const MAX_PREP_DEG: f64 = 60.0;
        let subjects = vec![
            constraint.a.part_id.clone(),
            constraint.b.part_id.clone(),
        ];
        let outcome = match constraint.parameters.prep_angle_deg {
            Some(angle) if (0.0..=MAX_PREP_DEG).contains(&angle) => CheckOutcome {
                category: CheckCategory::Geometry,
                status: CheckStatus::Pass,
                rule: "weld_prep_angle".to_string(),
                subjects,
                measured: Some(angle),
                bound: Some(MAX_PREP_DEG),
                message: format!("weld prep angle {:.1} deg", angle),
            },
            Some(angle) => CheckOutcome {
                category: CheckCategory::Geometry,
                status: CheckStatus::Fail,
                rule: "weld_prep_angle".to_string(),
                subjects,
                measured: Some(angle),
                bound: Some(MAX_PREP_DEG),
                message: format!(
                    "weld prep angle {:.1} deg outside 0-{:.0} deg",
                    angle, MAX_PREP_DEG
                ),
            },
            None => CheckOutcome {
                category: CheckCategory::Geometry,
                status: CheckStatus::Fail,
                rule: "weld_prep_angle".to_string(),
                subjects,
                measured: None,
                bound: Some(MAX_PREP_DEG),
                message: "welded joint without a prep angle".to_string(),
            },
        };
        outcomes.push(outcome);
    }

    /// Threaded joints need compatible nominal diameters on both ports
    fn check_thread_compat(&self, constraint: &Constraint, outcomes: &mut Vec<CheckOutcome>) {
        let subjects = vec![
            constraint.a.part_id.clone(),
            constraint.b.part_id.clone(),
        ];
        let dn_a = self
            .port(&constraint.a.part_id, constraint.a.port)
            .and_then(|p| p.dn);
        let dn_b = self
            .port(&constraint.b.part_id, constraint.b.port)
            .and_then(|p| p.dn);

        let (status, message) = match (dn_a, dn_b) {
            (Some(a), Some(b)) if a == b => {
                (CheckStatus::Pass, format!("thread diameters agree at dn{}", a))
            }
            (Some(a), Some(b)) => (
                CheckStatus::Fail,
                format!("thread diameters disagree: dn{} vs dn{}", a, b),
            ),
            _ => (
                CheckStatus::Warning,
                "threaded joint with unspecified port diameter".to_string(),
            ),
        };
        outcomes.push(CheckOutcome {
            category: CheckCategory::Geometry,
            status,
            rule: "thread_compatibility".to_string(),
            subjects,
            measured: None,
            bound: None,
            message,
        });
    }

    fn check_fasteners(&self, active: &[&Constraint], outcomes: &mut Vec<CheckOutcome>) {
        for constraint in active {
            let Some(bolt_count) = constraint.parameters.bolt_count else {
                continue;
            };
            let subjects = vec![constraint.id.to_string()];

            // Flange bolting comes in multiples of four
            let status = if bolt_count == 0 {
                CheckStatus::Fail
            } else if bolt_count % 4 != 0 {
                CheckStatus::Warning
            } else {
                CheckStatus::Pass
            };
            outcomes.push(CheckOutcome {
                category: CheckCategory::Fasteners,
                status,
                rule: "bolt_count".to_string(),
                subjects: subjects.clone(),
                measured: Some(f64::from(bolt_count)),
                bound: None,
                message: format!("{} bolts specified", bolt_count),
            });

            let pcd_ok = constraint.parameters.pcd_mm.is_some_and(|v| v > 0.0);
            outcomes.push(CheckOutcome {
                category: CheckCategory::Fasteners,
                status: if pcd_ok {
                    CheckStatus::Pass
                } else {
                    CheckStatus::Fail
                },
                rule: "pitch_circle_diameter".to_string(),
                subjects: subjects.clone(),
                measured: constraint.parameters.pcd_mm,
                bound: None,
                message: match constraint.parameters.pcd_mm {
                    Some(pcd) => format!("pitch circle diameter {:.1} mm", pcd),
                    None => "pitch circle diameter unresolved".to_string(),
                },
            });

            if constraint.parameters.gasket {
                let gasket_ok = constraint.parameters.gasket_type.is_some();
                outcomes.push(CheckOutcome {
                    category: CheckCategory::Fasteners,
                    status: if gasket_ok {
                        CheckStatus::Pass
                    } else {
                        CheckStatus::Fail
                    },
                    rule: "gasket_specified".to_string(),
                    subjects,
                    measured: None,
                    bound: None,
                    message: match &constraint.parameters.gasket_type {
                        Some(g) => format!("gasket type {}", g),
                        None => "gasket required but type unresolved".to_string(),
                    },
                });
            }
        }
    }

    fn check_standards(&self, active: &[&Constraint], outcomes: &mut Vec<CheckOutcome>) {
        for constraint in active {
            if constraint.parameters.bolt_count.is_none() {
                continue;
            }
            let resolved = constraint.parameters.bolt_material.is_some();
            outcomes.push(CheckOutcome {
                category: CheckCategory::Standards,
                status: if resolved {
                    CheckStatus::Pass
                } else {
                    CheckStatus::Fail
                },
                rule: "bolt_material_resolved".to_string(),
                subjects: vec![constraint.id.to_string()],
                measured: None,
                bound: None,
                message: match &constraint.parameters.bolt_material {
                    Some(mat) => format!("bolt material {}", mat),
                    None => "no standards row resolved for fasteners".to_string(),
                },
            });

            // Parts on mixed governing standards deserve a second look
            let std_a = self.registry.get(&constraint.a.part_id).and_then(|p| p.std.clone());
            let std_b = self.registry.get(&constraint.b.part_id).and_then(|p| p.std.clone());
            if let (Some(std_a), Some(std_b)) = (&std_a, &std_b) {
                if std_a != std_b {
                    outcomes.push(CheckOutcome {
                        category: CheckCategory::Standards,
                        status: CheckStatus::Warning,
                        rule: "mixed_standards".to_string(),
                        subjects: vec![
                            constraint.a.part_id.clone(),
                            constraint.b.part_id.clone(),
                        ],
                        measured: None,
                        bound: None,
                        message: format!("joint mixes {} and {}", std_a, std_b),
                    });
                }
            }
        }
    }

    fn check_completeness(
        &self,
        task: &AssemblyTask,
        constraints: &[Constraint],
        outcomes: &mut Vec<CheckOutcome>,
    ) {
        for orphan in &task.orphans {
            outcomes.push(CheckOutcome {
                category: CheckCategory::Completeness,
                status: CheckStatus::Fail,
                rule: "bom_line_resolved".to_string(),
                subjects: vec![orphan.label.clone()],
                measured: None,
                bound: None,
                message: format!("BOM line {}: {}", orphan.line, orphan.reason),
            });
        }

        let pending = constraints
            .iter()
            .filter(|c| {
                c.superseded_by.is_none()
                    && c.review_status == crate::core::entity::ReviewStatus::Pending
            })
            .count();
        outcomes.push(CheckOutcome {
            category: CheckCategory::Completeness,
            status: if pending == 0 {
                CheckStatus::Pass
            } else {
                CheckStatus::Warning
            },
            rule: "review_coverage".to_string(),
            subjects: vec![task.id.to_string()],
            measured: Some(pending as f64),
            bound: Some(0.0),
            message: format!("{} constraints awaiting review", pending),
        });
    }
}
