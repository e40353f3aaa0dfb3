//! Core types for the vessel branch kernel.

pub mod node;
pub mod position;
pub mod work_unit;
pub mod volume;

pub use node::{NodeId, PlaceStatus, ParentEdge};
pub use position::{Position, PositionMap};
pub use work_unit::{WorkUnit, SeedPath};
pub use volume::{LabelVolume, VolumeError};
