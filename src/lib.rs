//! # vessel-branch-kernel
//!
//! Branch topology annotation for anatomical vessel trees.
//!
//! The kernel guides a user through placing one labeled 3D point per branch
//! point of a portal or caval venous tree, then turns the finished topology
//! into the seed / end requests sent to a volumetric segmentation engine.
//!
//! ## Core Contract
//!
//! 1. [`BranchTree`] keeps an ordered, single-rooted tree of node ids with a
//!    placement status per node
//! 2. [`PlacementWizard`] is the only component mutating tree and points
//!    during interaction
//! 3. A [`SegmentPairingStrategy`] converts a finished tree into
//!    [`WorkUnit`]s; the [`Extractor`] feeds them to the engine and merges the
//!    results
//!
//! ## Architecture
//!
//! ```text
//! commands → PlacementWizard → BranchTree + PointSource
//!                                   ↓
//!                exporters / pairing strategies → WorkUnits → Extractor → engine
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same construction sequence → identical node, child and top-level orders
//! - Same tree → identical adjacency list and [`TopologySnapshot`] id
//! - Same tree + positions + strategy → identical work unit list

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod tree;
pub mod template;
pub mod points;
pub mod wizard;
pub mod pairing;
pub mod extraction;
pub mod export;
pub mod canonical;
pub mod config;
pub mod shared;

// Re-exports
pub use types::{NodeId, PlaceStatus, ParentEdge, Position, PositionMap};
pub use types::{WorkUnit, SeedPath, LabelVolume, VolumeError};
pub use tree::{BranchTree, NodeRecord, TreeError};
pub use template::{VeinId, VesselTemplate};
pub use points::{InMemoryPointSource, PointError, PointIndex, PointSource};
pub use wizard::{
    next_inserted_id, InteractionStatus, PlacementWizard, WizardCommand, WizardError,
    WizardEvent, SubscriptionId, Renderer, NoOpRenderer, RecordingRenderer,
};
pub use pairing::{
    SegmentPairingStrategy, StrategyKind, PairingError,
    AllInOne, OnePerBranch, OnePerParentAndSubChild, OnePerContinuousBranch,
};
pub use extraction::{
    Extraction, ExtractionError, ExtractionReport, Extractor, Segmentation, SegmentationEngine,
};
pub use export::{
    to_adjacency_list, from_adjacency_list, to_adjacency_matrix, to_dgtal,
    to_polyline, to_placed_polyline, vessel_branches,
    AdjacencyList, AdjacencyMatrix, DgtalGraph, VesselBranches, TopologySnapshot, ExportError,
};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use config::{KernelConfig, EngineParameters, LevelSetParameters, VesselnessParameters, ConfigError};
pub use shared::SharedWizard;

/// Schema version for all exported kernel types.
/// Increment on breaking changes to any schema type.
pub const VESSEL_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Default engine parameter set identifier.
pub const DEFAULT_ENGINE_PARAMS_VERSION: &str = "engine_params_v1";
