//! Placement solver and conflict detection
//!
//! Places parts by walking the accepted constraint graph breadth-first
//! from a deterministic anchor (the lexicographically smallest part id).
//! Each component solves independently; parts outside the anchor's
//! component are reported as a disconnected conflict. Translation-only
//! poses: a mate pins the child's port origin to the parent's, offset
//! along the parent port axis by the mate's nominal face offset.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::workspace::WorkspaceConfig;
use crate::engine::geometry::Vec3;
use crate::engine::registry::PartRegistry;
use crate::entities::constraint::Constraint;
use crate::entities::report::{Conflict, Placement};
use crate::entities::task::AssemblyTask;

/// Result of one solve pass
#[derive(Debug, Default)]
pub struct SolveResult {
    pub placements: Vec<Placement>,
    pub conflicts: Vec<Conflict>,

    /// Build order from the traversal, anchors first
    pub sequence: Vec<String>,
}

pub struct Solver<'a> {
    pub registry: &'a PartRegistry,
    pub config: &'a WorkspaceConfig,
}

impl Solver<'_> {
    pub fn solve(&self, task: &AssemblyTask, constraints: &[Constraint]) -> SolveResult {
        let mut parts: Vec<String> = Vec::new();
        for line in &task.resolved {
            if !parts.contains(&line.part_id) {
                parts.push(line.part_id.clone());
            }
        }
        let part_set: BTreeSet<&str> = parts.iter().map(String::as_str).collect();

        let active: Vec<&Constraint> = constraints
            .iter()
            .filter(|c| c.is_active(self.config.solver.pending_floor))
            .filter(|c| {
                part_set.contains(c.a.part_id.as_str()) && part_set.contains(c.b.part_id.as_str())
            })
            .collect();

        // Adjacency in constraint creation order keeps traversal stable
        let mut adjacency: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, constraint) in active.iter().enumerate() {
            adjacency
                .entry(constraint.a.part_id.as_str())
                .or_default()
                .push(idx);
            adjacency
                .entry(constraint.b.part_id.as_str())
                .or_default()
                .push(idx);
        }

        let mut result = SolveResult::default();
        let mut placed: BTreeMap<String, Vec3> = BTreeMap::new();
        // Which constraint placed each part, for conflict attribution
        let mut placed_by: BTreeMap<String, usize> = BTreeMap::new();
        let mut component_of: BTreeMap<String, usize> = BTreeMap::new();
        let mut over_constrained: BTreeSet<String> = BTreeSet::new();
        let mut component = 0usize;

        let mut unplaced: BTreeSet<String> = parts.iter().cloned().collect();
        while let Some(anchor) = unplaced.iter().next().cloned() {
            unplaced.remove(&anchor);
            placed.insert(anchor.clone(), Vec3::ZERO);
            component_of.insert(anchor.clone(), component);
            result.sequence.push(anchor.clone());

            let mut queue = VecDeque::from([anchor]);
            while let Some(current) = queue.pop_front() {
                let offset = placed[&current];
                let Some(edges) = adjacency.get(current.as_str()) else {
                    continue;
                };
                for &idx in edges {
                    let constraint = active[idx];
                    let (from, to) = if constraint.a.part_id == current {
                        (&constraint.a, &constraint.b)
                    } else {
                        (&constraint.b, &constraint.a)
                    };
                    let implied = self.mate_offset(&offset, constraint, &from.part_id, &to.part_id);

                    match placed.get(&to.part_id) {
                        Some(actual) => {
                            let disagreement = implied.distance(actual);
                            if disagreement > self.config.solver.pose_tol_mm
                                && over_constrained.insert(to.part_id.clone())
                            {
                                let mut ids =
                                    vec![constraint.id.clone()];
                                if let Some(&placer) = placed_by.get(&to.part_id) {
                                    ids.insert(0, active[placer].id.clone());
                                }
                                result.conflicts.push(Conflict::OverConstrained {
                                    part_id: to.part_id.clone(),
                                    constraint_ids: ids,
                                    disagreement_mm: disagreement,
                                    suggestion: format!(
                                        "review the constraints on {}; their poses disagree by {:.1} mm",
                                        to.part_id, disagreement
                                    ),
                                });
                            }
                        }
                        None => {
                            placed.insert(to.part_id.clone(), implied);
                            placed_by.insert(to.part_id.clone(), idx);
                            component_of.insert(to.part_id.clone(), component);
                            unplaced.remove(&to.part_id);
                            result.sequence.push(to.part_id.clone());
                            queue.push_back(to.part_id.clone());
                        }
                    }
                }
            }

            component += 1;
        }

        // Everything outside the anchor component is disconnected
        let stray: Vec<String> = parts
            .iter()
            .filter(|p| component_of.get(*p).copied() != Some(0))
            .cloned()
            .collect();
        if !stray.is_empty() {
            result.conflicts.push(Conflict::Disconnected {
                part_ids: stray,
                suggestion: "no accepted constraint ties these parts to the assembly".to_string(),
            });
        }

        self.detect_collisions(&parts, &placed, &component_of, &active, &mut result);

        result.placements = placed
            .into_iter()
            .map(|(part_id, offset)| Placement { part_id, offset })
            .collect();
        result
    }

    /// The child offset implied by mating `to` onto `from` at `offset`
    fn mate_offset(
        &self,
        offset: &Vec3,
        constraint: &Constraint,
        from: &str,
        to: &str,
    ) -> Vec3 {
        let (port_from, port_to) = if constraint.a.part_id == from {
            (constraint.a.port, constraint.b.port)
        } else {
            (constraint.b.port, constraint.a.port)
        };
        let port_from =
            port_from.and_then(|i| self.registry.get(from).and_then(|p| p.ports.get(i)));
        let port_to = port_to.and_then(|i| self.registry.get(to).and_then(|p| p.ports.get(i)));

        match (port_from, port_to) {
            (Some(pf), Some(pt)) => {
                let face_offset = constraint.parameters.face_offset_mm.unwrap_or(0.0);
                offset
                    .add(&pf.origin)
                    .add(&pf.axis.normalized().scale(face_offset))
                    .sub(&pt.origin)
            }
            // Without port geometry the parts share a pose
            _ => *offset,
        }
    }

    /// Report each colliding unconstrained pair exactly once
    fn detect_collisions(
        &self,
        parts: &[String],
        placed: &BTreeMap<String, Vec3>,
        component_of: &BTreeMap<String, usize>,
        active: &[&Constraint],
        result: &mut SolveResult,
    ) {
        let constrained: BTreeSet<(String, String)> =
            active.iter().map(|c| c.pair_key()).collect();
        let clearance = self.config.solver.collision_clearance_mm;

        for (i, a) in parts.iter().enumerate() {
            for b in parts.iter().skip(i + 1) {
                if component_of.get(a) != component_of.get(b) {
                    continue;
                }
                let pair = if a <= b {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                if constrained.contains(&pair) {
                    continue;
                }
                let (Some(part_a), Some(part_b)) = (self.registry.get(a), self.registry.get(b))
                else {
                    continue;
                };
                let (Some(fp_a), Some(fp_b)) =
                    (&part_a.geom_fingerprint, &part_b.geom_fingerprint)
                else {
                    continue;
                };
                let (Some(off_a), Some(off_b)) = (placed.get(a), placed.get(b)) else {
                    continue;
                };

                if fp_a
                    .bbox
                    .translated(off_a)
                    .overlaps(&fp_b.bbox.translated(off_b), clearance)
                {
                    result.conflicts.push(Conflict::Collision {
                        part_a: pair.0,
                        part_b: pair.1,
                        suggestion: format!(
                            "{} and {} occupy the same space; add a constraint or respace them",
                            a, b
                        ),
                    });
                }
            }
        }
    }
}
