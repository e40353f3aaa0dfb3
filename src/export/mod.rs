//! Topology exporters.
//!
//! Read-only views of a finished [`BranchTree`](crate::tree::BranchTree):
//!
//! - **Adjacency**: the `[parent | null, child]` interchange list, a
//!   symmetric adjacency matrix and the DGtal vertex / edge form
//! - **Polyline**: one continuous coordinate sequence for renderers
//! - **Snapshot**: a canonical fingerprint for provenance
//!
//! ## Ordering
//!
//! Matrix rows and DGtal vertices follow `node_list()` order. Edges follow
//! the adjacency list order.

pub mod adjacency;
pub mod polyline;
pub mod snapshot;

pub use adjacency::{
    to_adjacency_list, from_adjacency_list, to_adjacency_matrix, to_dgtal,
    AdjacencyList, AdjacencyMatrix, DgtalGraph,
};
pub use polyline::{to_polyline, to_placed_polyline, vessel_branches, VesselBranches};
pub use snapshot::TopologySnapshot;

use crate::tree::TreeError;
use crate::types::NodeId;

/// Error type for exporters.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A node of the tree has no position.
    #[error("No position for node: {0}")]
    MissingPosition(NodeId),

    /// Rebuilding a tree failed.
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
