//! Elevation constraint enforcer
//!
//! Connectors start at the terrain elevation (or their fixed value).
//! Constraints are grouped into independent components, and each component
//! is solved by iterative relaxation: every violated constraint moves one of
//! its connectors by the missing distance. The connector to move is the
//! cheaper one:
//! - fixed connectors never move
//! - `Above` connectors move up for free, `Below` connectors move down for free
//! - `On` connectors are moved last
//!
//! A satisfiable component settles within the Bellman-Ford bound of one pass
//! per connector; as either end of a constraint may move, the budget is twice
//! that. A component that still violates a constraint after its budget is
//! contradictory. It falls back to its initial elevations plus one relaxation pass and is
//! reported, while all other components are still resolved.

use std::collections::HashMap;
use std::time::Instant;

use glam::{DVec2, DVec3};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;

use super::connector::{ConnectorId, EleConnector, GroundState};
use crate::conversion::ConversionLog;
use crate::error::ConstraintUnsatisfiableError;
use crate::map_data::NodeIdx;
use crate::math::{xyz, POSITION_EPSILON};

/// Violations smaller than this count as satisfied
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConstraintType {
    /// `ele(upper) - ele(lower) >= distance`
    Min,
    /// `ele(upper) - ele(lower) <= distance`
    Max,
    /// `ele(upper) - ele(lower) == distance`
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalConstraint {
    pub kind: ConstraintType,
    pub distance: f64,
    pub upper: ConnectorId,
    pub lower: ConnectorId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnforcerState {
    Created,
    Collecting,
    Solving,
    Resolved,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

type IndexedConnector = GeomWithData<[f64; 2], usize>;

pub struct EleConstraintEnforcer {
    state: EnforcerState,
    connectors: Vec<EleConnector>,
    fixed: Vec<Option<f64>>,
    elevations: Vec<f64>,
    constraints: Vec<VerticalConstraint>,
    index: RTree<IndexedConnector>,
}

impl Default for EleConstraintEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl EleConstraintEnforcer {
    pub fn new() -> Self {
        Self {
            state: EnforcerState::Created,
            connectors: Vec::new(),
            fixed: Vec::new(),
            elevations: Vec::new(),
            constraints: Vec::new(),
            index: RTree::new(),
        }
    }

    pub fn state(&self) -> EnforcerState {
        self.state
    }

    fn begin_collecting(&mut self) {
        debug_assert!(
            matches!(self.state, EnforcerState::Created | EnforcerState::Collecting),
            "connectors and constraints must be registered before solving"
        );
        self.state = EnforcerState::Collecting;
    }

    /// Register a new, independent connector
    pub fn add_connector(
        &mut self,
        pos: DVec2,
        ground_state: GroundState,
        reference: Option<NodeIdx>,
    ) -> ConnectorId {
        self.begin_collecting();
        let id = ConnectorId(self.connectors.len());
        self.connectors.push(EleConnector { id, pos, ground_state, reference });
        self.fixed.push(None);
        self.elevations.push(0.0);
        self.index.insert(GeomWithData::new([pos.x, pos.y], id.0));
        id
    }

    /// Connector at the same position and ground state, created if missing
    pub fn shared_connector(
        &mut self,
        pos: DVec2,
        ground_state: GroundState,
        reference: Option<NodeIdx>,
    ) -> ConnectorId {
        let existing = self
            .index
            .locate_within_distance([pos.x, pos.y], POSITION_EPSILON * POSITION_EPSILON)
            .map(|entry| entry.data)
            .filter(|&i| self.connectors[i].ground_state == ground_state)
            .min();
        match existing {
            Some(i) => ConnectorId(i),
            None => self.add_connector(pos, ground_state, reference),
        }
    }

    pub fn connector(&self, id: ConnectorId) -> &EleConnector {
        &self.connectors[id.0]
    }

    pub fn connectors(&self) -> &[EleConnector] {
        &self.connectors
    }

    pub fn constraints(&self) -> &[VerticalConstraint] {
        &self.constraints
    }

    /// Pin a connector to an absolute elevation
    pub fn fix_elevation(&mut self, id: ConnectorId, ele: f64) {
        self.begin_collecting();
        self.fixed[id.0] = Some(ele);
    }

    pub fn require_vertical_distance(
        &mut self,
        kind: ConstraintType,
        distance: f64,
        upper: ConnectorId,
        lower: ConnectorId,
    ) {
        self.begin_collecting();
        if upper == lower {
            return;
        }
        self.constraints.push(VerticalConstraint { kind, distance, upper, lower });
    }

    pub fn require_same_elevation(&mut self, a: ConnectorId, b: ConnectorId) {
        self.require_vertical_distance(ConstraintType::Exact, 0.0, a, b);
    }

    /// Resolved elevation. Before `enforce` this is 0.
    pub fn elevation(&self, id: ConnectorId) -> f64 {
        self.elevations[id.0]
    }

    pub fn position_xyz(&self, id: ConnectorId) -> DVec3 {
        xyz(self.connectors[id.0].pos, self.elevations[id.0])
    }

    /// Solve all constraints, starting from the terrain elevation.
    ///
    /// Contradictory components get a best-effort elevation, are written to
    /// the log and make this return an error after everything else is solved.
    pub fn enforce(
        &mut self,
        terrain: &dyn Fn(DVec2) -> f64,
        log: &ConversionLog,
    ) -> Result<(), ConstraintUnsatisfiableError> {
        let start = Instant::now();
        self.state = EnforcerState::Solving;

        let initial: Vec<f64> = self
            .connectors
            .iter()
            .zip(&self.fixed)
            .map(|(c, fixed)| fixed.unwrap_or_else(|| terrain(c.pos)))
            .collect();
        self.elevations = initial.clone();

        let components = self.components();
        let mut failed_components = 0;
        let mut unsatisfied_constraints = 0;

        for constraints in &components {
            if self.solve_component(constraints) {
                continue;
            }

            for c in constraints {
                for id in [c.upper, c.lower] {
                    self.elevations[id.0] = initial[id.0];
                }
            }
            self.relax_pass(constraints);

            let unsatisfied = constraints.iter().filter(|c| self.violation(c).is_some()).count();
            failed_components += 1;
            unsatisfied_constraints += unsatisfied;

            let positions: Vec<String> = component_connectors(constraints)
                .iter()
                .take(4)
                .map(|id| {
                    let p = self.connectors[id.0].pos;
                    format!("({:.1}, {:.1})", p.x, p.y)
                })
                .collect();
            log.error(
                None,
                format!(
                    "{} contradictory elevation constraints near {}",
                    constraints.len(),
                    positions.join(", ")
                ),
            );
        }

        log::info!(
            "[Elevation] {} connectors, {} constraints in {} groups solved in {:?} ({} failed)",
            self.connectors.len(),
            self.constraints.len(),
            components.len(),
            start.elapsed(),
            failed_components
        );

        if failed_components > 0 {
            self.state = EnforcerState::Failed;
            Err(ConstraintUnsatisfiableError {
                failed_components,
                total_components: components.len(),
                unsatisfied_constraints,
            })
        } else {
            self.state = EnforcerState::Resolved;
            Ok(())
        }
    }

    /// Constraints grouped by the connectors they link, in registration order
    fn components(&self) -> Vec<Vec<VerticalConstraint>> {
        let mut parent: Vec<usize> = (0..self.connectors.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for c in &self.constraints {
            let a = find(&mut parent, c.upper.0);
            let b = find(&mut parent, c.lower.0);
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        // root connector -> group index
        let mut roots: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<VerticalConstraint>> = Vec::new();
        for c in &self.constraints {
            let root = find(&mut parent, c.upper.0);
            let group = *roots.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(*c);
        }
        groups
    }

    /// Relax until no constraint is violated. Returns false if the
    /// component cannot be satisfied.
    fn solve_component(&mut self, constraints: &[VerticalConstraint]) -> bool {
        let connector_count = component_connectors(constraints).len();
        let max_passes = 2 * (connector_count + 1);

        for _ in 0..max_passes {
            match self.relax_pass(constraints) {
                PassResult::Settled => return true,
                PassResult::Stuck => return false,
                PassResult::Moved => {}
            }
        }
        constraints.iter().all(|c| self.violation(c).is_none())
    }

    fn relax_pass(&mut self, constraints: &[VerticalConstraint]) -> PassResult {
        let mut moved = false;
        for c in constraints {
            let Some(deficit) = self.violation(c) else {
                continue;
            };
            // a positive deficit needs more distance, a negative one less
            let (upper_dir, lower_dir) = if deficit > 0.0 {
                (Direction::Up, Direction::Down)
            } else {
                (Direction::Down, Direction::Up)
            };
            let upper_cost = self.move_cost(c.upper, upper_dir);
            let lower_cost = self.move_cost(c.lower, lower_dir);
            if upper_cost == u8::MAX && lower_cost == u8::MAX {
                return PassResult::Stuck;
            }

            let move_upper = if upper_cost == lower_cost {
                // ties lift things: raise the upper end for Min, the lower end for Max
                upper_dir == Direction::Up
            } else {
                upper_cost < lower_cost
            };

            if move_upper {
                self.elevations[c.upper.0] += deficit;
            } else {
                self.elevations[c.lower.0] -= deficit;
            }
            moved = true;
        }
        if moved {
            PassResult::Moved
        } else {
            PassResult::Settled
        }
    }

    /// Distance missing to satisfy the constraint, `None` if satisfied
    fn violation(&self, c: &VerticalConstraint) -> Option<f64> {
        let actual = self.elevations[c.upper.0] - self.elevations[c.lower.0];
        let deficit = c.distance - actual;
        let violated = match c.kind {
            ConstraintType::Min => deficit > TOLERANCE,
            ConstraintType::Max => deficit < -TOLERANCE,
            ConstraintType::Exact => deficit.abs() > TOLERANCE,
        };
        violated.then_some(deficit)
    }

    fn move_cost(&self, id: ConnectorId, direction: Direction) -> u8 {
        if self.fixed[id.0].is_some() {
            return u8::MAX;
        }
        match (self.connectors[id.0].ground_state, direction) {
            (GroundState::Above, Direction::Up) | (GroundState::Below, Direction::Down) => 0,
            (GroundState::On, _) => 2,
            _ => 1,
        }
    }
}

enum PassResult {
    Settled,
    Moved,
    Stuck,
}

fn component_connectors(constraints: &[VerticalConstraint]) -> Vec<ConnectorId> {
    let mut ids: Vec<ConnectorId> = constraints.iter().flat_map(|c| [c.upper, c.lower]).collect();
    ids.sort();
    ids.dedup();
    ids
}
