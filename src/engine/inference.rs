//! Constraint inference
//!
//! Turns a task's BOM into mate constraints: resolve each line against
//! the catalog (directly or through the name matcher), pair up candidate
//! parts, resolve the best template per pair, evaluate its formulas, and
//! score confidence. BOM lines that cannot be resolved become orphan
//! records; they are reported, never dropped.
//!
//! Confidence is the product of template specificity, a geometric prior
//! (1.0 when port axes mate, 0.6 when port geometry is missing or
//! misaligned), and the learned pattern boost, capped at 1.0.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::entity::ReviewStatus;
use crate::core::error::EngineError;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workspace::WorkspaceConfig;
use crate::engine::formula;
use crate::engine::geometry::antiparallel_deviation_deg;
use crate::engine::matcher::NameMatcher;
use crate::engine::registry::PartRegistry;
use crate::engine::templates::{TemplateLibrary, TemplateMatch};
use crate::entities::constraint::{Constraint, MateEndpoint, MateParameters};
use crate::entities::part::Part;
use crate::entities::pattern::{AssemblyPattern, PatternKey};
use crate::entities::standards::StandardsTable;
use crate::entities::task::{AssemblyTask, OrphanLine, ResolutionMethod, ResolvedLine, TaskStatus};
use crate::entities::template::NumericSpec;

const GEOMETRIC_PRIOR_ALIGNED: f64 = 1.0;
const GEOMETRIC_PRIOR_MISSING: f64 = 0.6;

/// Everything one inference run produced
#[derive(Debug, Default)]
pub struct InferenceOutcome {
    /// Freshly inferred constraints, in pair order
    pub constraints: Vec<Constraint>,

    /// Prior constraints superseded by this run (old id, new id)
    pub superseded: Vec<(EntityId, EntityId)>,

    /// Pairs skipped because an approved constraint already covers them
    pub kept_approved: Vec<EntityId>,

    /// Pairs suppressed because a reviewer already rejected them
    pub kept_rejected: Vec<EntityId>,

    /// Candidate pairs no template covered, in pair order
    pub unmatched: Vec<(String, String)>,
}

/// The inference engine over one workspace's catalog state
pub struct InferenceEngine<'a> {
    pub registry: &'a PartRegistry,
    pub library: &'a TemplateLibrary,
    pub standards: &'a StandardsTable,
    pub patterns: &'a [AssemblyPattern],
    pub matcher: &'a NameMatcher,
    pub config: &'a WorkspaceConfig,
}

impl InferenceEngine<'_> {
    /// Run inference for a task. Resolves the BOM in place, supersedes
    /// stale constraints from earlier runs, and returns the new ones.
    ///
    /// Pairs are visited in a deterministic order, so two runs over the
    /// same workspace state produce identical constraints (ids aside).
    pub fn run(
        &self,
        task: &mut AssemblyTask,
        existing: &mut [Constraint],
    ) -> Result<InferenceOutcome, EngineError> {
        self.resolve_bom(task);

        let mut outcome = InferenceOutcome::default();
        for (line_a, line_b) in self.candidate_pairs(task) {
            let part_a = self.registry.require(&line_a.part_id)?;
            let part_b = self.registry.require(&line_b.part_id)?;

            let Some(template_match) = self.library.resolve(part_a, part_b) else {
                outcome
                    .unmatched
                    .push((line_a.part_id.clone(), line_b.part_id.clone()));
                continue;
            };

            let constraint = self.build_constraint(task, part_a, part_b, &template_match)?;

            // One constraint per unordered pair per task. A reviewed
            // decision from an earlier run wins over re-inference: an
            // approved prior stands, a rejected prior suppresses the pair.
            let pair = constraint.pair_key();
            let prior = existing.iter_mut().find(|c| {
                c.task_id == task.id && c.superseded_by.is_none() && c.pair_key() == pair
            });
            match prior {
                Some(prior) if prior.review_status == ReviewStatus::Approved => {
                    outcome.kept_approved.push(prior.id.clone());
                }
                Some(prior) if prior.review_status == ReviewStatus::Rejected => {
                    outcome.kept_rejected.push(prior.id.clone());
                }
                Some(prior) => {
                    prior.superseded_by = Some(constraint.id.clone());
                    outcome
                        .superseded
                        .push((prior.id.clone(), constraint.id.clone()));
                    task.constraint_ids.push(constraint.id.clone());
                    outcome.constraints.push(constraint);
                }
                None => {
                    task.constraint_ids.push(constraint.id.clone());
                    outcome.constraints.push(constraint);
                }
            }
        }

        task.status = TaskStatus::Inferred;
        Ok(outcome)
    }

    /// Bind every BOM line to a catalog part or record it as an orphan
    fn resolve_bom(&self, task: &mut AssemblyTask) {
        task.resolved.clear();
        task.orphans.clear();

        for (line_idx, line) in task.bom.iter().enumerate() {
            if let Some(part_id) = &line.part_id {
                if self.registry.get(part_id).is_some() {
                    task.resolved.push(ResolvedLine {
                        line: line_idx,
                        part_id: part_id.clone(),
                        qty: line.qty,
                        method: ResolutionMethod::Direct,
                    });
                } else {
                    task.orphans.push(OrphanLine {
                        line: line_idx,
                        label: line.label().to_string(),
                        reason: format!("part '{}' not in catalog", part_id),
                    });
                }
                continue;
            }

            let Some(raw_name) = &line.raw_name else {
                task.orphans.push(OrphanLine {
                    line: line_idx,
                    label: line.label().to_string(),
                    reason: "BOM line has neither part_id nor raw_name".to_string(),
                });
                continue;
            };

            match self.matcher.best(raw_name) {
                Some(best) => task.resolved.push(ResolvedLine {
                    line: line_idx,
                    part_id: best.part_id,
                    qty: line.qty,
                    method: ResolutionMethod::Matched {
                        similarity: best.similarity,
                    },
                }),
                None => task.orphans.push(OrphanLine {
                    line: line_idx,
                    label: raw_name.clone(),
                    reason: "no catalog part cleared the similarity floor".to_string(),
                }),
            }
        }
    }

    /// Candidate pairs: consecutive resolved BOM lines, plus any pair
    /// whose port geometry mates within the configured thresholds.
    fn candidate_pairs(&self, task: &AssemblyTask) -> Vec<(ResolvedLine, ResolvedLine)> {
        let mut pairs = Vec::new();
        let mut seen: BTreeSet<(usize, usize)> = BTreeSet::new();

        for window in task.resolved.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            if a.part_id != b.part_id && seen.insert((a.line, b.line)) {
                pairs.push((a.clone(), b.clone()));
            }
        }

        for (i, a) in task.resolved.iter().enumerate() {
            for b in task.resolved.iter().skip(i + 1) {
                if a.part_id == b.part_id || seen.contains(&(a.line, b.line)) {
                    continue;
                }
                let (Some(part_a), Some(part_b)) =
                    (self.registry.get(&a.part_id), self.registry.get(&b.part_id))
                else {
                    continue;
                };
                if self.ports_mate(part_a, part_b).is_some() && seen.insert((a.line, b.line)) {
                    pairs.push((a.clone(), b.clone()));
                }
            }
        }

        pairs
    }

    /// Find a mating port pair: equal or unspecified dn, axes within the
    /// anti-parallel tolerance, origins within the proximity threshold
    fn ports_mate(&self, a: &Part, b: &Part) -> Option<(usize, usize)> {
        let settings = &self.config.inference;
        for (i, port_a) in a.ports.iter().enumerate() {
            for (j, port_b) in b.ports.iter().enumerate() {
                if let (Some(dn_a), Some(dn_b)) = (port_a.dn, port_b.dn) {
                    if dn_a != dn_b {
                        continue;
                    }
                }
                let deviation = antiparallel_deviation_deg(&port_a.axis, &port_b.axis);
                if deviation > settings.antiparallel_tol_deg {
                    continue;
                }
                if port_a.origin.distance(&port_b.origin) > settings.proximity_threshold_mm {
                    continue;
                }
                return Some((i, j));
            }
        }
        None
    }

    fn build_constraint(
        &self,
        task: &AssemblyTask,
        part_a: &Part,
        part_b: &Part,
        template_match: &TemplateMatch<'_>,
    ) -> Result<Constraint, EngineError> {
        let template = template_match.template;
        let mut reasoning = vec![format!(
            "template {} matched {}/{} with specificity {:.2}",
            template.template_id, part_a.family, part_b.family, template_match.specificity
        )];

        let (port_a, port_b, geometric_prior) = match self.ports_mate(part_a, part_b) {
            Some((i, j)) => {
                reasoning.push("port axes mate within tolerance".to_string());
                (Some(i), Some(j), GEOMETRIC_PRIOR_ALIGNED)
            }
            None => {
                reasoning.push(
                    "no mating port geometry, confidence reduced".to_string(),
                );
                (None, None, GEOMETRIC_PRIOR_MISSING)
            }
        };

        let dn = template.dn.or(part_a.dn).or(part_b.dn);
        let pn = template.pn.or(part_a.pn).or(part_b.pn);

        let key = PatternKey::new(part_a.family, part_b.family, dn, pn, &template.template_id);
        let boost = self
            .patterns
            .iter()
            .find(|p| p.key == key)
            .map_or(1.0, |p| {
                let boost = p.boost(self.config.pattern.min_support);
                if boost > 1.0 {
                    reasoning.push(format!(
                        "learned pattern boost {:.3} from {} reviews",
                        boost, p.support_count
                    ));
                }
                boost
            });

        let mut confidence =
            (template_match.specificity * geometric_prior * boost).min(1.0);
        let mut review_required = false;

        let mut parameters = MateParameters {
            axis_align: template.mate_schema.axis_align,
            angle_tol_deg: template.mate_schema.angle_tol_deg,
            gap_tol_mm: template.mate_schema.gap_tol_mm,
            face_offset_mm: template.mate_schema.face_offset_mm,
            prep_angle_deg: template.mate_schema.prep_angle_deg,
            ..MateParameters::default()
        };

        if let Some(fasteners) = &template.fasteners {
            parameters.bolt_count = Some(fasteners.bolt_count);
            parameters.bolt_spec = Some(fasteners.bolt_spec.clone());
            parameters.gasket = fasteners.gasket;

            let mut vars = BTreeMap::new();
            if let Some(dn) = dn {
                vars.insert("dn".to_string(), f64::from(dn));
            }
            if let Some(pn) = pn {
                vars.insert("pn".to_string(), f64::from(pn));
            }
            match &fasteners.pcd_mm {
                NumericSpec::Literal(value) => parameters.pcd_mm = Some(*value),
                NumericSpec::Formula(expr) => match formula::evaluate(expr, &vars) {
                    Ok(value) => parameters.pcd_mm = Some(value),
                    Err(err) => {
                        // A broken formula zeroes confidence and forces
                        // a human decision instead of aborting the task
                        confidence = 0.0;
                        review_required = true;
                        reasoning.push(format!("fastener formula failed: {}", err));
                    }
                },
            }

            let row = self
                .standards
                .resolve_defaults(task.line_class.as_deref(), task.project_id.as_deref())?;
            parameters.bolt_material = Some(row.bolt_material.clone());
            if fasteners.gasket {
                parameters.gasket_type = Some(row.gasket_type.clone());
            }
        }

        Ok(Constraint {
            id: EntityId::new(EntityPrefix::Con),
            created: Utc::now(),
            task_id: task.id.clone(),
            a: MateEndpoint {
                part_id: part_a.part_id.clone(),
                port: port_a,
            },
            b: MateEndpoint {
                part_id: part_b.part_id.clone(),
                port: port_b,
            },
            template_id: template.template_id.clone(),
            swapped: template_match.swapped,
            join_rule: template.join_rule,
            parameters,
            confidence,
            original_confidence: confidence,
            reasoning,
            review_status: ReviewStatus::Pending,
            review_required,
            adjustments: Vec::new(),
            superseded_by: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::MatcherSettings;
    use crate::engine::geometry::Vec3;
    use crate::engine::matcher::{part_vector, NameMatcher};
    use crate::entities::part::{PartFamily, Port, PortType};
    use crate::entities::task::BomLine;
    use crate::entities::template::{
        ConnectionTemplate, FastenerSpec, JoinRule, MateSchema, NumericSpec,
    };

    fn pipe(id: &str, dn: u32) -> Part {
        let mut part = Part::new(id, PartFamily::Pipe);
        part.dn = Some(dn);
        part.ports.push(Port {
            port_type: PortType::Bore,
            axis: Vec3::new(0.0, 0.0, 1.0),
            origin: Vec3::new(0.0, 0.0, 100.0),
            dn: Some(dn),
            face_type: None,
        });
        part
    }

    fn flange(id: &str, dn: u32, pn: u32) -> Part {
        let mut part = Part::new(id, PartFamily::Flange);
        part.dn = Some(dn);
        part.pn = Some(pn);
        part.ports.push(Port {
            port_type: PortType::Face,
            axis: Vec3::new(0.0, 0.0, -1.0),
            origin: Vec3::new(0.0, 0.0, 110.0),
            dn: Some(dn),
            face_type: None,
        });
        part
    }

    fn pipe_flange_template(pcd: NumericSpec) -> ConnectionTemplate {
        ConnectionTemplate {
            template_id: "PIPE_FLANGE".to_string(),
            family_a: PartFamily::Pipe,
            family_b: PartFamily::Flange,
            dn: Some(50),
            pn: Some(16),
            end_type: None,
            face_type: None,
            join_rule: JoinRule::CoaxialPlaneCoincident,
            mate_schema: MateSchema {
                axis_align: true,
                angle_tol_deg: Some(2.0),
                gap_tol_mm: Some(0.1),
                face_offset_mm: Some(0.0),
                prep_angle_deg: None,
            },
            fasteners: Some(FastenerSpec {
                bolt_count: 4,
                bolt_spec: "M16".to_string(),
                pcd_mm: pcd,
                gasket: true,
            }),
            selector: Default::default(),
        }
    }

    fn standards() -> StandardsTable {
        StandardsTable::from_yaml(concat!(
            "rows:\n",
            "  - line_class: DEFAULT\n",
            "    bolt_material: \"A193 B7\"\n",
            "    gasket_type: spiral_wound\n",
            "  - line_class: LC-B2\n",
            "    bolt_material: \"Q235 8.8\"\n",
            "    gasket_type: flat_ring\n",
        ))
        .unwrap()
    }

    struct Fixture {
        registry: PartRegistry,
        library: TemplateLibrary,
        standards: StandardsTable,
        matcher: NameMatcher,
        config: WorkspaceConfig,
    }

    impl Fixture {
        fn new(parts: Vec<Part>, templates: Vec<ConnectionTemplate>) -> Self {
            let matcher = NameMatcher::new(&MatcherSettings::default());
            matcher.rebuild(parts.iter().map(part_vector).collect());
            Self {
                registry: PartRegistry::from_parts(parts),
                library: TemplateLibrary::from_templates(templates),
                standards: standards(),
                matcher,
                config: WorkspaceConfig::default(),
            }
        }

        fn engine<'a>(&'a self, patterns: &'a [AssemblyPattern]) -> InferenceEngine<'a> {
            InferenceEngine {
                registry: &self.registry,
                library: &self.library,
                standards: &self.standards,
                patterns,
                matcher: &self.matcher,
                config: &self.config,
            }
        }
    }

    fn task_with(ids: &[&str]) -> AssemblyTask {
        let mut task = AssemblyTask::new(EntityId::new(EntityPrefix::Task), "t");
        for id in ids {
            task.bom.push(BomLine {
                part_id: Some(id.to_string()),
                raw_name: None,
                qty: 1,
            });
        }
        task
    }

    #[test]
    fn test_infers_pipe_flange_constraint() {
        let fixture = Fixture::new(
            vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)],
            vec![pipe_flange_template(NumericSpec::Formula(
                "125+(dn-50)*2.5".to_string(),
            ))],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);

        let outcome = fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        assert_eq!(outcome.constraints.len(), 1);

        let c = &outcome.constraints[0];
        assert_eq!(c.template_id, "PIPE_FLANGE");
        assert_eq!(c.parameters.pcd_mm, Some(125.0));
        assert_eq!(c.parameters.bolt_material.as_deref(), Some("A193 B7"));
        assert_eq!(c.parameters.gasket_type.as_deref(), Some("spiral_wound"));
        // specificity 0.6 (dn+pn keyed), ports aligned
        assert!((c.confidence - 0.6).abs() < 1e-12);
        assert_eq!(c.a.port, Some(0));
        assert_eq!(task.status, TaskStatus::Inferred);
        assert_eq!(task.constraint_ids, vec![c.id.clone()]);
    }

    #[test]
    fn test_line_class_selects_standards_row() {
        let fixture = Fixture::new(
            vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)],
            vec![pipe_flange_template(NumericSpec::Literal(125.0))],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);
        task.line_class = Some("LC-B2".to_string());

        let outcome = fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        let c = &outcome.constraints[0];
        assert_eq!(c.parameters.bolt_material.as_deref(), Some("Q235 8.8"));
        assert_eq!(c.parameters.gasket_type.as_deref(), Some("flat_ring"));
    }

    #[test]
    fn test_formula_failure_forces_review() {
        let fixture = Fixture::new(
            vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)],
            vec![pipe_flange_template(NumericSpec::Formula(
                "125+(bore-50)*2.5".to_string(),
            ))],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);

        let outcome = fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        let c = &outcome.constraints[0];
        assert_eq!(c.confidence, 0.0);
        assert!(c.review_required);
        assert!(c.parameters.pcd_mm.is_none());
        assert!(c.reasoning.iter().any(|r| r.contains("formula failed")));
    }

    #[test]
    fn test_unresolved_lines_become_orphans() {
        let fixture = Fixture::new(vec![pipe("PIPE-DN50", 50)], vec![]);
        let mut task = task_with(&["PIPE-DN50", "VALVE-DN999"]);
        task.bom.push(BomLine {
            part_id: None,
            raw_name: Some("hydraulic accumulator".to_string()),
            qty: 1,
        });

        fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        assert_eq!(task.resolved.len(), 1);
        assert_eq!(task.orphans.len(), 2);
        assert_eq!(task.resolved.len() + task.orphans.len(), task.bom.len());
        assert!(task.orphans[0].reason.contains("VALVE-DN999"));
    }

    #[test]
    fn test_name_resolution_through_matcher() {
        let fixture = Fixture::new(
            vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)],
            vec![],
        );
        let mut task = AssemblyTask::new(EntityId::new(EntityPrefix::Task), "t");
        task.bom.push(BomLine {
            part_id: None,
            raw_name: Some("50mm flange pn16".to_string()),
            qty: 1,
        });

        fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        assert_eq!(task.resolved.len(), 1);
        assert_eq!(task.resolved[0].part_id, "FLANGE-DN50-PN16");
        assert!(matches!(
            task.resolved[0].method,
            ResolutionMethod::Matched { similarity } if similarity > 0.3
        ));
    }

    #[test]
    fn test_reinference_supersedes_pending_keeps_approved() {
        let fixture = Fixture::new(
            vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)],
            vec![pipe_flange_template(NumericSpec::Literal(125.0))],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);

        let first = fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        let mut existing = first.constraints;

        // Pending constraint is superseded on re-run
        let second = fixture.engine(&[]).run(&mut task, &mut existing).unwrap();
        assert_eq!(second.superseded.len(), 1);
        assert!(existing[0].superseded_by.is_some());

        // An approved constraint survives re-inference untouched
        let mut approved = second.constraints;
        approved[0].review_status = ReviewStatus::Approved;
        let third = fixture.engine(&[]).run(&mut task, &mut approved).unwrap();
        assert!(third.constraints.is_empty());
        assert_eq!(third.kept_approved, vec![approved[0].id.clone()]);
        assert!(approved[0].superseded_by.is_none());
    }

    fn supported_pattern(is_validated: bool) -> AssemblyPattern {
        AssemblyPattern {
            id: EntityId::new(EntityPrefix::Ptrn),
            created: Utc::now(),
            key: PatternKey::new(
                PartFamily::Pipe,
                PartFamily::Flange,
                Some(50),
                Some(16),
                "PIPE_FLANGE",
            ),
            support_count: 5,
            approvals: 5,
            rejections: 0,
            is_validated,
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn test_validated_pattern_boosts_confidence() {
        let parts = vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)];
        let fixture = Fixture::new(
            parts,
            vec![pipe_flange_template(NumericSpec::Literal(125.0))],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);

        let pattern = supported_pattern(true);
        let boosted = fixture
            .engine(std::slice::from_ref(&pattern))
            .run(&mut task, &mut [])
            .unwrap();
        // 0.6 specificity * 1.0 geometric * 1.15 boost
        assert!((boosted.constraints[0].confidence - 0.69).abs() < 1e-9);
    }

    #[test]
    fn test_unvalidated_pattern_leaves_confidence_alone() {
        let parts = vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)];
        let fixture = Fixture::new(
            parts,
            vec![pipe_flange_template(NumericSpec::Literal(125.0))],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);

        // Well supported but never validated by a curator
        let pattern = supported_pattern(false);
        let outcome = fixture
            .engine(std::slice::from_ref(&pattern))
            .run(&mut task, &mut [])
            .unwrap();
        assert!((outcome.constraints[0].confidence - 0.6).abs() < 1e-12);
        assert!(!outcome.constraints[0]
            .reasoning
            .iter()
            .any(|r| r.contains("pattern boost")));
    }

    #[test]
    fn test_rejected_prior_suppresses_reinference() {
        let fixture = Fixture::new(
            vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)],
            vec![pipe_flange_template(NumericSpec::Literal(125.0))],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);

        let first = fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        let mut existing = first.constraints;
        existing[0].review_status = ReviewStatus::Rejected;

        let second = fixture.engine(&[]).run(&mut task, &mut existing).unwrap();
        assert!(second.constraints.is_empty());
        assert!(second.superseded.is_empty());
        assert_eq!(second.kept_rejected, vec![existing[0].id.clone()]);
        assert!(existing[0].superseded_by.is_none());
        assert_eq!(existing[0].review_status, ReviewStatus::Rejected);
    }

    #[test]
    fn test_pair_without_template_is_recorded() {
        let fixture = Fixture::new(
            vec![pipe("PIPE-DN50", 50), flange("FLANGE-DN50-PN16", 50, 16)],
            vec![],
        );
        let mut task = task_with(&["PIPE-DN50", "FLANGE-DN50-PN16"]);

        let outcome = fixture.engine(&[]).run(&mut task, &mut []).unwrap();
        assert!(outcome.constraints.is_empty());
        assert_eq!(
            outcome.unmatched,
            vec![("PIPE-DN50".to_string(), "FLANGE-DN50-PN16".to_string())]
        );
    }
}
