//! Point positions in scanner (RAS) coordinates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::node::NodeId;
use crate::canonical::quantize;

/// A 3D point position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub [f64; 3]);

impl Position {
    /// Create a position from its coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    /// Coordinates as an array.
    pub fn coords(&self) -> [f64; 3] {
        self.0
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Quantize coordinates for hashing (1e-6 precision).
    pub fn quantized(&self) -> [i64; 3] {
        self.0.map(quantize)
    }
}

impl From<[f64; 3]> for Position {
    fn from(coords: [f64; 3]) -> Self {
        Self(coords)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

/// Label -> position mapping read from a point source.
///
/// Keeps the order in which labels were first seen.
pub type PositionMap = IndexMap<NodeId, Position>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_quantized_ignores_float_noise() {
        let a = Position::new(0.1 + 0.2, 1.0, -2.5);
        let b = Position::new(0.3, 1.0, -2.5);
        assert_eq!(a.quantized(), b.quantized());
    }
}
