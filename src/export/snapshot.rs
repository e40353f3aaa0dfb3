//! Topology snapshot identity.
//!
//! A `TopologySnapshot` fingerprints a tree (structure and placement
//! statuses, optionally the node positions) so exports and extraction
//! reports can state exactly which topology they were computed from.

use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::canonical::{canonical_hash_hex, to_canonical_bytes};
use crate::tree::BranchTree;
use crate::types::PositionMap;
use crate::VESSEL_KERNEL_SCHEMA_VERSION;

/// A deterministic fingerprint of a branch tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// Unique identifier for this snapshot (xxh64 of all components).
    pub snapshot_id: String,
    /// Number of nodes.
    pub node_count: u64,
    /// Number of parent -> child edges.
    pub edge_count: u64,
    /// Root id, if any.
    pub root_id: Option<String>,
    /// Schema version used for types.
    pub schema_version: String,
    /// Hash of the adjacency list.
    pub edge_list_hash: String,
    /// Hash of `(id, status)` pairs in node list order.
    pub status_hash: String,
    /// Hash of quantized positions, when positions were supplied.
    pub position_hash: Option<String>,
    /// Unix timestamp when this snapshot was computed.
    pub computed_at: i64,
}

/// Internal struct for computing snapshot_id hash.
#[derive(Serialize)]
struct SnapshotIdInput<'a> {
    node_count: u64,
    edge_count: u64,
    root_id: Option<&'a str>,
    schema_version: &'a str,
    edge_list_hash: &'a str,
    status_hash: &'a str,
    position_hash: Option<&'a str>,
}

impl TopologySnapshot {
    /// Fingerprint the structure and statuses of `tree`.
    pub fn compute(tree: &BranchTree) -> Result<Self, ExportError> {
        Self::compute_inner(tree, None)
    }

    /// Fingerprint `tree` together with the positions of its nodes.
    ///
    /// Positions of labels that are not in the tree are ignored.
    pub fn compute_with_positions(tree: &BranchTree, positions: &PositionMap) -> Result<Self, ExportError> {
        Self::compute_inner(tree, Some(positions))
    }

    fn compute_inner(tree: &BranchTree, positions: Option<&PositionMap>) -> Result<Self, ExportError> {
        let edges = tree.tree_parent_list();
        let edge_count = edges.iter().filter(|e| e.parent().is_some()).count() as u64;
        let edge_list_hash = canonical_hash_hex(&edges)?;

        let statuses: Vec<(String, String)> = tree
            .iter()
            .map(|(id, record)| (id.to_string(), record.status.to_string()))
            .collect();
        let status_hash = canonical_hash_hex(&statuses)?;

        let position_hash = match positions {
            Some(positions) => {
                let quantized: Vec<(String, Option<[i64; 3]>)> = tree
                    .node_list()
                    .into_iter()
                    .map(|id| {
                        let q = positions.get(&id).map(|p| p.quantized());
                        (id.into_string(), q)
                    })
                    .collect();
                Some(canonical_hash_hex(&quantized)?)
            }
            None => None,
        };

        let root_id = tree.root_id().map(|r| r.to_string());
        let node_count = tree.len() as u64;

        let snapshot_id = canonical_hash_hex(&SnapshotIdInput {
            node_count,
            edge_count,
            root_id: root_id.as_deref(),
            schema_version: VESSEL_KERNEL_SCHEMA_VERSION,
            edge_list_hash: &edge_list_hash,
            status_hash: &status_hash,
            position_hash: position_hash.as_deref(),
        })?;

        Ok(Self {
            snapshot_id,
            node_count,
            edge_count,
            root_id,
            schema_version: VESSEL_KERNEL_SCHEMA_VERSION.to_string(),
            edge_list_hash,
            status_hash,
            position_hash,
            computed_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Serialize to canonical JSON bytes.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, ExportError> {
        Ok(to_canonical_bytes(self)?)
    }

    /// Verify that this snapshot matches `tree`.
    ///
    /// Snapshots taken with positions cannot be verified against the tree
    /// alone and always fail here.
    pub fn verify(&self, tree: &BranchTree) -> bool {
        match Self::compute(tree) {
            Ok(recomputed) => self.snapshot_id == recomputed.snapshot_id,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, PlaceStatus, Position};

    fn build() -> BranchTree {
        let mut tree = BranchTree::new();
        tree.insert_after_node("A", None).unwrap();
        tree.insert_after_node("B", Some("A")).unwrap();
        tree.insert_after_node("C", Some("A")).unwrap();
        tree
    }

    #[test]
    fn test_snapshot_determinism() {
        let s1 = TopologySnapshot::compute(&build()).unwrap();
        let s2 = TopologySnapshot::compute(&build()).unwrap();
        assert_eq!(s1.snapshot_id, s2.snapshot_id);
        assert_eq!(s1.node_count, 3);
        assert_eq!(s1.edge_count, 2);
        assert_eq!(s1.root_id.as_deref(), Some("A"));
        assert!(s1.verify(&build()));
    }

    #[test]
    fn test_snapshot_changes_with_status_and_order() {
        let base = TopologySnapshot::compute(&build()).unwrap();

        let mut placed = build();
        placed.set_status("B", PlaceStatus::Placed).unwrap();
        assert_ne!(base.snapshot_id, TopologySnapshot::compute(&placed).unwrap().snapshot_id);

        let mut reordered = BranchTree::new();
        reordered.insert_after_node("A", None).unwrap();
        reordered.insert_after_node("C", Some("A")).unwrap();
        reordered.insert_after_node("B", Some("A")).unwrap();
        assert!(!base.verify(&reordered));
    }

    #[test]
    fn test_snapshot_with_positions() {
        let tree = build();
        let mut positions = PositionMap::new();
        positions.insert(NodeId::new("A"), Position::new(0.0, 0.0, 0.0));

        let with = TopologySnapshot::compute_with_positions(&tree, &positions).unwrap();
        let without = TopologySnapshot::compute(&tree).unwrap();
        assert!(with.position_hash.is_some());
        assert_ne!(with.snapshot_id, without.snapshot_id);

        positions.insert(NodeId::new("A"), Position::new(0.0, 0.0, 1e-9));
        let nudged = TopologySnapshot::compute_with_positions(&tree, &positions).unwrap();
        assert_eq!(with.snapshot_id, nudged.snapshot_id);
    }
}
