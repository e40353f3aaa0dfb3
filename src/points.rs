//! Labeled point sources.
//!
//! The wizard never owns geometry. It talks to a [`PointSource`]: a list of
//! 3D points, each carrying a label (the node id once placed) and a visibility
//! flag, plus a global lock flag and the placement mode toggle of the host.
//!
//! [`InMemoryPointSource`] is the implementation used by tests and by the
//! offline tooling.

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Position, PositionMap};

/// Index of a point in its source.
pub type PointIndex = usize;

/// Error type for point source operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointError {
    /// Point index out of range.
    #[error("Point index out of range: {0}")]
    IndexOutOfRange(PointIndex),

    /// No point carries this label.
    #[error("No point labeled {0}")]
    UnknownLabel(String),
}

/// Collection of labeled points the wizard reads and writes.
///
/// Implementations must keep point indices stable until `remove_all`.
pub trait PointSource {
    /// Append a point and return its index.
    fn add_point(&mut self, position: Position) -> PointIndex;

    /// Relabel the point at `index`.
    fn set_label(&mut self, index: PointIndex, label: &NodeId) -> Result<(), PointError>;

    /// Index of the most recently added point.
    fn last_point_index(&self) -> Option<PointIndex>;

    /// Number of points.
    fn point_count(&self) -> usize;

    /// Label of the point at `index`.
    fn label_at(&self, index: PointIndex) -> Option<&str>;

    /// Position of the point labeled `label`. The last matching point wins.
    fn position(&self, label: &str) -> Option<Position>;

    /// Show or hide every point labeled `label`.
    fn set_visible(&mut self, label: &str, visible: bool);

    /// Show or hide the point at `index`.
    fn set_point_visible(&mut self, index: PointIndex, visible: bool) -> Result<(), PointError>;

    /// Visibility of the point labeled `label`.
    fn is_visible(&self, label: &str) -> Option<bool>;

    /// Lock or unlock every point against direct manipulation.
    fn set_locked(&mut self, locked: bool);

    /// Whether points are locked.
    fn is_locked(&self) -> bool;

    /// Toggle the host's placement mode (clicks add points).
    fn set_place_mode_enabled(&mut self, enabled: bool);

    /// Whether the host's placement mode is on.
    fn is_place_mode_enabled(&self) -> bool;

    /// Move the point labeled `label`.
    fn move_point(&mut self, label: &str, position: Position) -> Result<(), PointError>;

    /// Remove every point.
    fn remove_all(&mut self);

    /// Label -> position map. When labels repeat the last point wins.
    fn positions(&self) -> PositionMap {
        let mut map = PositionMap::new();
        for index in 0..self.point_count() {
            if let (Some(label), Some(pos)) = (self.label_at(index), self.position_at(index)) {
                map.insert(NodeId::new(label), pos);
            }
        }
        map
    }

    /// Position of the point at `index`.
    fn position_at(&self, index: PointIndex) -> Option<Position>;

    /// Labels of every point, in index order.
    fn labels(&self) -> Vec<String> {
        (0..self.point_count())
            .filter_map(|i| self.label_at(i).map(str::to_string))
            .collect()
    }
}

/// One stored point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Current label.
    pub label: String,
    /// Position.
    pub position: Position,
    /// Whether the point is shown.
    pub visible: bool,
}

/// In-memory point source for testing and offline sessions.
///
/// New points get a default label `P-<n>` from a counter owned by the
/// source until the wizard relabels them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPointSource {
    points: Vec<PointRecord>,
    locked: bool,
    place_mode: bool,
    next_default_label: u64,
}

impl InMemoryPointSource {
    /// Create a new empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from labeled positions.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = (&'a NodeId, &'a Position)>) -> Self {
        let mut source = Self::new();
        for (label, pos) in positions {
            let index = source.add_point(*pos);
            source.points[index].label = label.as_str().to_string();
        }
        source
    }

    /// All stored points.
    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    fn last_index_of(&self, label: &str) -> Option<PointIndex> {
        self.points.iter().rposition(|p| p.label == label)
    }
}

impl PointSource for InMemoryPointSource {
    fn add_point(&mut self, position: Position) -> PointIndex {
        self.next_default_label += 1;
        self.points.push(PointRecord {
            label: format!("P-{}", self.next_default_label),
            position,
            visible: true,
        });
        self.points.len() - 1
    }

    fn set_label(&mut self, index: PointIndex, label: &NodeId) -> Result<(), PointError> {
        let point = self
            .points
            .get_mut(index)
            .ok_or(PointError::IndexOutOfRange(index))?;
        point.label = label.as_str().to_string();
        Ok(())
    }

    fn last_point_index(&self) -> Option<PointIndex> {
        self.points.len().checked_sub(1)
    }

    fn point_count(&self) -> usize {
        self.points.len()
    }

    fn label_at(&self, index: PointIndex) -> Option<&str> {
        self.points.get(index).map(|p| p.label.as_str())
    }

    fn position_at(&self, index: PointIndex) -> Option<Position> {
        self.points.get(index).map(|p| p.position)
    }

    fn position(&self, label: &str) -> Option<Position> {
        self.last_index_of(label).map(|i| self.points[i].position)
    }

    fn set_visible(&mut self, label: &str, visible: bool) {
        for point in self.points.iter_mut().filter(|p| p.label == label) {
            point.visible = visible;
        }
    }

    fn set_point_visible(&mut self, index: PointIndex, visible: bool) -> Result<(), PointError> {
        let point = self
            .points
            .get_mut(index)
            .ok_or(PointError::IndexOutOfRange(index))?;
        point.visible = visible;
        Ok(())
    }

    fn is_visible(&self, label: &str) -> Option<bool> {
        self.last_index_of(label).map(|i| self.points[i].visible)
    }

    fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn set_place_mode_enabled(&mut self, enabled: bool) {
        self.place_mode = enabled;
    }

    fn is_place_mode_enabled(&self) -> bool {
        self.place_mode
    }

    fn move_point(&mut self, label: &str, position: Position) -> Result<(), PointError> {
        let index = self
            .last_index_of(label)
            .ok_or_else(|| PointError::UnknownLabel(label.to_string()))?;
        self.points[index].position = position;
        Ok(())
    }

    fn remove_all(&mut self) {
        self.points.clear();
    }
}
