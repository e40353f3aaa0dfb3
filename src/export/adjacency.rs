//! Adjacency list, adjacency matrix and DGtal graph exports.

use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::tree::BranchTree;
use crate::types::{NodeId, ParentEdge, Position, PositionMap};

/// `[parent | null, child]` pairs describing every edge of a tree.
///
/// This is the interchange form of a topology. Re-ingesting it with
/// [`from_adjacency_list`] reproduces the same list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjacencyList(pub Vec<ParentEdge>);

impl AdjacencyList {
    /// Entries in list order.
    pub fn edges(&self) -> &[ParentEdge] {
        &self.0
    }

    /// Number of entries (top-level entries included).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Adjacency list of `tree`.
pub fn to_adjacency_list(tree: &BranchTree) -> AdjacencyList {
    AdjacencyList(tree.tree_parent_list())
}

/// Rebuild a tree from its adjacency list.
pub fn from_adjacency_list(list: &AdjacencyList) -> Result<BranchTree, ExportError> {
    Ok(BranchTree::from_parent_list(list.edges())?)
}

/// Symmetric 0/1 adjacency matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyMatrix {
    /// Row / column ids, in `node_list()` order.
    pub ids: Vec<NodeId>,
    /// `matrix[i][j] == 1` iff `ids[i]` and `ids[j]` share an edge.
    pub matrix: Vec<Vec<u8>>,
}

/// Adjacency matrix of `tree`.
pub fn to_adjacency_matrix(tree: &BranchTree) -> AdjacencyMatrix {
    let ids = tree.node_list();
    let n = ids.len();
    let mut matrix = vec![vec![0u8; n]; n];

    for (i, j) in edge_indices(tree, &ids) {
        matrix[i][j] = 1;
        matrix[j][i] = 1;
    }

    AdjacencyMatrix { ids, matrix }
}

/// Graph in the vertex / edge index form used by DGtal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DgtalGraph {
    /// `[parent_index, child_index]` pairs into `vertices`.
    pub edges: Vec<[usize; 2]>,
    /// Vertex positions, in `node_list()` order.
    pub vertices: Vec<Position>,
}

/// Export `tree` with the node positions as a DGtal graph.
///
/// Every node needs a position.
pub fn to_dgtal(positions: &PositionMap, tree: &BranchTree) -> Result<DgtalGraph, ExportError> {
    let ids = tree.node_list();
    let vertices = ids
        .iter()
        .map(|id| {
            positions
                .get(id)
                .copied()
                .ok_or_else(|| ExportError::MissingPosition(id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let edges = edge_indices(tree, &ids)
        .into_iter()
        .map(|(i, j)| [i, j])
        .collect();

    Ok(DgtalGraph { edges, vertices })
}

/// `(parent, child)` index pairs into `ids`, in adjacency list order.
fn edge_indices(tree: &BranchTree, ids: &[NodeId]) -> Vec<(usize, usize)> {
    let index_of = |id: &NodeId| ids.iter().position(|x| x == id);
    tree.tree_parent_list()
        .iter()
        .filter_map(|edge| {
            let parent = edge.parent()?;
            Some((index_of(parent)?, index_of(edge.child())?))
        })
        .collect()
}
