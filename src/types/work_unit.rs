//! Segmentation work units.
//!
//! A work unit is one request to the segmentation engine: a set of seed
//! positions where region growth starts and a set of end positions that bound
//! it. Ids are carried alongside positions so callers can report which
//! branch points produced which request.

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use super::position::Position;

/// One (seed set, end set) engine request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Node ids of the seed positions, same order as `seeds`.
    pub seed_ids: Vec<NodeId>,
    /// Seed positions.
    pub seeds: Vec<Position>,
    /// Node ids of the end positions, same order as `ends`.
    pub end_ids: Vec<NodeId>,
    /// End positions.
    pub ends: Vec<Position>,
}

impl WorkUnit {
    /// A single seed / single end unit.
    pub fn pair(seed: (NodeId, Position), end: (NodeId, Position)) -> Self {
        Self {
            seed_ids: vec![seed.0],
            seeds: vec![seed.1],
            end_ids: vec![end.0],
            ends: vec![end.1],
        }
    }

    /// Push a seed point.
    pub fn push_seed(&mut self, id: NodeId, pos: Position) {
        self.seed_ids.push(id);
        self.seeds.push(pos);
    }

    /// Push an end point.
    pub fn push_end(&mut self, id: NodeId, pos: Position) {
        self.end_ids.push(id);
        self.ends.push(pos);
    }

    /// `(seed, end)` id pair for single seed / single end units.
    pub fn id_pair(&self) -> Option<(&NodeId, &NodeId)> {
        match (self.seed_ids.as_slice(), self.end_ids.as_slice()) {
            ([s], [e]) => Some((s, e)),
            _ => None,
        }
    }

    /// Whether the unit can be sent to an engine.
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty() || self.ends.is_empty()
    }
}

impl From<&SeedPath> for WorkUnit {
    fn from(path: &SeedPath) -> Self {
        let mut unit = WorkUnit::default();
        if let Some(((last_id, last_pos), rest)) = path.points.split_last() {
            for (id, pos) in rest {
                unit.push_seed(id.clone(), *pos);
            }
            unit.push_end(last_id.clone(), *last_pos);
        }
        unit
    }
}

/// An ordered chain of labeled points along one vessel.
///
/// All points but the last are seeds, the last one is the stopper.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeedPath {
    /// Points in path order.
    pub points: Vec<(NodeId, Position)>,
}

impl SeedPath {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point.
    pub fn push(&mut self, id: NodeId, pos: Position) {
        self.points.push((id, pos));
    }

    /// A path needs at least one seed and one stopper.
    pub fn is_valid(&self) -> bool {
        self.points.len() > 1
    }

    /// Seed positions (all but the last point).
    pub fn seed_positions(&self) -> Vec<Position> {
        match self.points.split_last() {
            Some((_, rest)) => rest.iter().map(|(_, p)| *p).collect(),
            None => Vec::new(),
        }
    }

    /// Stopper position (the last point).
    pub fn stopper_position(&self) -> Option<Position> {
        self.points.last().map(|(_, p)| *p)
    }

    /// Id of the first point.
    pub fn first_id(&self) -> Option<&NodeId> {
        self.points.first().map(|(id, _)| id)
    }

    /// Id of the last point.
    pub fn last_id(&self) -> Option<&NodeId> {
        self.points.last().map(|(id, _)| id)
    }

    /// Whether `next` continues where this path stops.
    pub fn can_combine(&self, next: &SeedPath) -> bool {
        matches!((self.last_id(), next.first_id()), (Some(a), Some(b)) if a == b)
    }

    /// Join `next` onto this path, sharing the junction point.
    ///
    /// Returns `None` when the paths do not connect.
    pub fn combine(&self, next: &SeedPath) -> Option<SeedPath> {
        if !self.can_combine(next) {
            return None;
        }
        let mut points = self.points.clone();
        points.extend(next.points.iter().skip(1).cloned());
        Some(SeedPath { points })
    }
}
