//! Single-polyline rendering of a tree and the branch summary.
//!
//! A tree is drawn as one continuous line: the walk emits a parent, descends
//! into a child subtree and emits the parent again on the way back.
//!
//! ```text
//! parent
//!   |_ child
//!   |     |_ sub child
//!   |_ child2
//!
//! => [parent, child, sub child, child, parent, child2, parent]
//! ```

use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::template::VeinId;
use crate::tree::BranchTree;
use crate::types::{NodeId, Position, PositionMap};

/// Polyline of the whole tree. Every node needs a position.
pub fn to_polyline(tree: &BranchTree, positions: &PositionMap) -> Result<Vec<Position>, ExportError> {
    let mut out = Vec::new();
    for root in tree.top_level_ids() {
        strict_walk(tree, positions, root, &mut out)?;
    }
    Ok(out)
}

fn strict_walk(
    tree: &BranchTree,
    positions: &PositionMap,
    id: &NodeId,
    out: &mut Vec<Position>,
) -> Result<(), ExportError> {
    let pos = positions
        .get(id)
        .copied()
        .ok_or_else(|| ExportError::MissingPosition(id.clone()))?;
    out.push(pos);
    for child in tree.children_ids(id.as_str()) {
        strict_walk(tree, positions, child, out)?;
        out.push(pos);
    }
    Ok(())
}

/// Polyline of the placed part of the tree.
///
/// Nodes without a position are skipped: their children hang off the
/// closest positioned ancestor. This is the renderer feed while placement is
/// still in progress.
pub fn to_placed_polyline(tree: &BranchTree, positions: &PositionMap) -> Vec<Position> {
    let mut out = Vec::new();
    for root in tree.top_level_ids() {
        lenient_walk(tree, positions, root, None, &mut out);
    }
    out
}

fn lenient_walk(
    tree: &BranchTree,
    positions: &PositionMap,
    id: &NodeId,
    anchor: Option<Position>,
    out: &mut Vec<Position>,
) {
    match positions.get(id).copied() {
        Some(pos) => {
            out.push(pos);
            for child in tree.children_ids(id.as_str()) {
                let before = out.len();
                lenient_walk(tree, positions, child, Some(pos), out);
                if out.len() > before {
                    out.push(pos);
                }
            }
        }
        None => {
            let mut emitted = false;
            for child in tree.children_ids(id.as_str()) {
                let mut sub = Vec::new();
                lenient_walk(tree, positions, child, anchor, &mut sub);
                if sub.is_empty() {
                    continue;
                }
                if let (true, Some(anchor)) = (emitted, anchor) {
                    out.push(anchor);
                }
                out.extend(sub);
                emitted = true;
            }
        }
    }
}

/// Template branches present in a tree with their start and end points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VesselBranches {
    /// Template ids present in the tree, in template order.
    pub names: Vec<NodeId>,
    /// Positions of the placed roots among them.
    pub start_points: Vec<Position>,
    /// Positions of the placed leaves among them.
    pub end_points: Vec<Position>,
}

/// Summarize the template branches of `tree`.
///
/// Usable mid-placement: every template id in the tree is named, but a root
/// or leaf without a position contributes no start or end point.
pub fn vessel_branches(tree: &BranchTree, positions: &PositionMap) -> VesselBranches {
    let mut branches = VesselBranches::default();
    for id in VeinId::SORTED_IDS {
        if !tree.contains(id) {
            continue;
        }
        let node = NodeId::new(id);
        let position = positions.get(&node).copied();
        if tree.is_root(id) {
            branches.start_points.extend(position);
        } else if tree.is_leaf(id) {
            branches.end_points.extend(position);
        }
        branches.names.push(node);
    }
    branches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::VesselTemplate;

    fn p(v: f64) -> Position {
        Position::new(v, 0.0, 0.0)
    }

    /// parent[child[sub], child2]
    fn small_tree() -> BranchTree {
        let mut tree = BranchTree::new();
        tree.insert_after_node("parent", None).unwrap();
        tree.insert_after_node("child", Some("parent")).unwrap();
        tree.insert_after_node("sub", Some("child")).unwrap();
        tree.insert_after_node("child2", Some("parent")).unwrap();
        tree
    }

    fn all_positions() -> PositionMap {
        let mut positions = PositionMap::new();
        positions.insert(NodeId::new("parent"), p(0.0));
        positions.insert(NodeId::new("child"), p(1.0));
        positions.insert(NodeId::new("sub"), p(2.0));
        positions.insert(NodeId::new("child2"), p(3.0));
        positions
    }

    #[test]
    fn test_polyline_returns_to_parent() {
        let line = to_polyline(&small_tree(), &all_positions()).unwrap();
        assert_eq!(line, vec![p(0.0), p(1.0), p(2.0), p(1.0), p(0.0), p(3.0), p(0.0)]);
    }

    #[test]
    fn test_polyline_strict_missing() {
        let mut positions = all_positions();
        positions.shift_remove("sub");
        assert!(matches!(
            to_polyline(&small_tree(), &positions),
            Err(ExportError::MissingPosition(id)) if id == "sub"
        ));
    }

    #[test]
    fn test_placed_polyline_matches_strict_when_complete() {
        let tree = small_tree();
        let positions = all_positions();
        assert_eq!(
            to_placed_polyline(&tree, &positions),
            to_polyline(&tree, &positions).unwrap()
        );
    }

    #[test]
    fn test_placed_polyline_skips_unplaced() {
        let tree = small_tree();
        let mut positions = all_positions();
        positions.shift_remove("child");
        assert_eq!(
            to_placed_polyline(&tree, &positions),
            vec![p(0.0), p(2.0), p(0.0), p(3.0), p(0.0)]
        );

        positions.shift_remove("sub");
        assert_eq!(to_placed_polyline(&tree, &positions), vec![p(0.0), p(3.0), p(0.0)]);
    }

    #[test]
    fn test_placed_polyline_empty() {
        assert!(to_placed_polyline(&small_tree(), &PositionMap::new()).is_empty());
    }

    #[test]
    fn test_vessel_branches() {
        let mut tree = BranchTree::new();
        tree.insert_after_node(VeinId::PORTAL_VEIN_ROOT, None).unwrap();
        tree.insert_after_node(VeinId::PORTAL_VEIN, Some(VeinId::PORTAL_VEIN_ROOT)).unwrap();
        tree.insert_after_node("extra", Some(VeinId::PORTAL_VEIN)).unwrap();
        tree.insert_after_node(VeinId::LEFT_PORTAL_VEIN, Some(VeinId::PORTAL_VEIN)).unwrap();

        let mut positions = PositionMap::new();
        positions.insert(NodeId::new(VeinId::PORTAL_VEIN_ROOT), p(0.0));
        positions.insert(NodeId::new(VeinId::PORTAL_VEIN), p(1.0));
        positions.insert(NodeId::new(VeinId::LEFT_PORTAL_VEIN), p(2.0));

        let branches = vessel_branches(&tree, &positions);
        let names: Vec<_> = branches.names.iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec![VeinId::PORTAL_VEIN_ROOT, VeinId::PORTAL_VEIN, VeinId::LEFT_PORTAL_VEIN]
        );
        assert_eq!(branches.start_points, vec![p(0.0)]);
        assert_eq!(branches.end_points, vec![p(2.0)]);
    }

    #[test]
    fn test_vessel_branches_skip_unplaced_ends() {
        let tree = VesselTemplate::Portal.build().unwrap();
        let mut positions = PositionMap::new();
        positions.insert(NodeId::new(VeinId::PORTAL_VEIN_ROOT), p(0.0));
        positions.insert(NodeId::new(VeinId::SEGMENTAL_BRANCH_3), p(3.0));

        let branches = vessel_branches(&tree, &positions);
        assert_eq!(branches.names.len(), tree.len());
        assert_eq!(branches.start_points, vec![p(0.0)]);
        assert_eq!(branches.end_points, vec![p(3.0)]);
    }
}
