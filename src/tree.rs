//! Branch tree: the topology of the annotated vessel.
//!
//! Nodes are stored in an id-indexed record store plus an explicit ordered
//! list of top-level ids. A well formed tree has a single top-level node (the
//! root). Inserting a second node with no parent temporarily creates more
//! than one top-level node only while reordering, see [`BranchTree::enforce_one_root`].
//!
//! ## Ordering
//!
//! - `node_list()` follows first insertion order and survives removals.
//! - Children keep their insertion order; reattached children are appended.
//! - `tree_parent_list()` lists every top-level node first, then walks each
//!   root emitting all child edges of a node before recursing into them.
//!
//! Identical construction sequences always give identical orders, which is
//! what the exporters and the snapshot fingerprint rely on.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, ParentEdge, PlaceStatus};

/// Error type for tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Referenced node is not in the tree.
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    /// Moving a node under one of its own descendants.
    #[error("Moving {node} under {target} would create a cycle")]
    WouldCreateCycle {
        /// Node being moved.
        node: NodeId,
        /// Requested new parent or child.
        target: NodeId,
    },

    /// A node was used as its own parent or child.
    #[error("Node cannot reference itself: {0}")]
    SelfReference(NodeId),
}

/// Stored state of one node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Parent id, `None` for a top-level node.
    pub parent: Option<NodeId>,
    /// Children in order.
    pub children: Vec<NodeId>,
    /// Placement status.
    pub status: PlaceStatus,
}

/// The branch topology of a vessel tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchTree {
    nodes: IndexMap<NodeId, NodeRecord>,
    top_level: Vec<NodeId>,
}

fn non_empty(id: Option<&str>) -> Option<&str> {
    id.filter(|s| !s.is_empty())
}

impl BranchTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tree from an adjacency list by repeated [`insert_after_node`](Self::insert_after_node).
    pub fn from_parent_list(edges: &[ParentEdge]) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        for edge in edges {
            tree.insert_after_node(edge.child().clone(), edge.parent().map(|p| p.as_str()))?;
        }
        Ok(tree)
    }

    // ─── Insertion ───

    /// Add `id` as the last child of `parent`.
    ///
    /// With no parent (or an empty one) `id` becomes the root. If a root
    /// already exists, the previous first top-level node becomes a child of
    /// `id`.
    ///
    /// If `id` is already in the tree it is moved, together with its subtree.
    pub fn insert_after_node(
        &mut self,
        id: impl Into<NodeId>,
        parent: Option<&str>,
    ) -> Result<(), TreeError> {
        let id = id.into();
        let parent = non_empty(parent);

        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(TreeError::NotFound(NodeId::new(parent)));
            }
            if parent == id.as_str() {
                return Err(TreeError::SelfReference(id));
            }
            if self.nodes.contains_key(id.as_str()) && self.is_ancestor(id.as_str(), parent) {
                return Err(TreeError::WouldCreateCycle {
                    node: id,
                    target: NodeId::new(parent),
                });
            }
        }

        self.take(&id);

        match parent {
            Some(parent) => self.attach_child(parent, id.clone()),
            None => {
                self.nodes.entry(id.clone()).or_default();
                self.top_level.push(id.clone());
                if self.top_level.len() > 1 {
                    let previous_root = self.top_level.remove(0);
                    self.attach_child(id.as_str(), previous_root);
                }
            }
        }

        tracing::trace!(node = %id, parent = ?parent, "insert_after_node");
        Ok(())
    }

    /// Splice `id` into the edge above `child`.
    ///
    /// `id` takes the former parent of `child` and `child` becomes the last
    /// child of `id`. With no child this behaves like
    /// `insert_after_node(id, None)`.
    pub fn insert_before_node(
        &mut self,
        id: impl Into<NodeId>,
        child: Option<&str>,
    ) -> Result<(), TreeError> {
        let id = id.into();
        let Some(child) = non_empty(child) else {
            return self.insert_after_node(id, None);
        };

        if !self.nodes.contains_key(child) {
            return Err(TreeError::NotFound(NodeId::new(child)));
        }
        if child == id.as_str() {
            return Err(TreeError::SelfReference(id));
        }
        if self.nodes.contains_key(id.as_str()) {
            if self.parent_id(child) == Some(&id) {
                return Ok(());
            }
            if self.is_ancestor(child, id.as_str()) || self.is_ancestor(id.as_str(), child) {
                return Err(TreeError::WouldCreateCycle {
                    node: id,
                    target: NodeId::new(child),
                });
            }
        }

        self.take(&id);

        let child_id = NodeId::new(child);
        let parent = self.parent_id(child).cloned();
        match parent {
            Some(parent) => {
                let Some(record) = self.nodes.get_mut(parent.as_str()) else {
                    return Err(TreeError::NotFound(parent));
                };
                if let Some(slot) = record.children.iter().position(|c| c == child) {
                    record.children[slot] = id.clone();
                }
                self.nodes.entry(id.clone()).or_default().parent = Some(parent);
            }
            None => {
                if let Some(slot) = self.top_level.iter().position(|c| c == child) {
                    self.top_level[slot] = id.clone();
                }
                self.nodes.entry(id.clone()).or_default().parent = None;
            }
        }
        self.attach_child(id.as_str(), child_id);

        tracing::trace!(node = %id, child = %child, "insert_before_node");
        Ok(())
    }

    /// [`insert_before_node`](Self::insert_before_node) and set the status of
    /// the inserted node.
    pub fn insert_before_node_with_status(
        &mut self,
        id: impl Into<NodeId>,
        child: Option<&str>,
        status: PlaceStatus,
    ) -> Result<(), TreeError> {
        let id = id.into();
        self.insert_before_node(id.clone(), child)?;
        self.set_status(id.as_str(), status)
    }

    /// Drop `id` (with its subtree) at `index` of the top-level list.
    ///
    /// This is the reorder a drag and drop produces. It may leave several
    /// top-level nodes behind; call [`enforce_one_root`](Self::enforce_one_root)
    /// afterwards.
    pub fn move_to_top_level(&mut self, id: &str, index: usize) -> Result<(), TreeError> {
        let Some(id) = self.nodes.get_key_value(id).map(|(k, _)| k.clone()) else {
            return Err(TreeError::NotFound(NodeId::new(id)));
        };
        self.take(&id);
        let index = index.min(self.top_level.len());
        self.top_level.insert(index, id);
        Ok(())
    }

    // ─── Removal ───

    /// Remove `id` from the tree.
    ///
    /// A root with more than one child is kept and `Ok(false)` is returned.
    /// A root with a single child is replaced by that child in its top-level
    /// slot. Any other node hands its children over to its parent, appended
    /// after the existing siblings.
    pub fn remove_node(&mut self, id: &str) -> Result<bool, TreeError> {
        let Some(record) = self.nodes.get(id) else {
            return Err(TreeError::NotFound(NodeId::new(id)));
        };
        let parent = record.parent.clone();
        let children = record.children.clone();

        match parent {
            None => {
                if children.len() > 1 {
                    tracing::debug!(node = %id, children = children.len(), "refusing to remove branching root");
                    return Ok(false);
                }
                let slot = self.top_level.iter().position(|c| c == id).unwrap_or(0);
                self.top_level.retain(|c| c != id);
                if let Some(child) = children.into_iter().next() {
                    if let Some(rec) = self.nodes.get_mut(child.as_str()) {
                        rec.parent = None;
                    }
                    let slot = slot.min(self.top_level.len());
                    self.top_level.insert(slot, child);
                }
            }
            Some(parent) => {
                for child in &children {
                    if let Some(rec) = self.nodes.get_mut(child.as_str()) {
                        rec.parent = Some(parent.clone());
                    }
                }
                if let Some(rec) = self.nodes.get_mut(parent.as_str()) {
                    rec.children.retain(|c| c != id);
                    rec.children.extend(children);
                }
            }
        }

        self.nodes.shift_remove(id);
        tracing::debug!(node = %id, "removed node");
        Ok(true)
    }

    /// Remove every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.top_level.clear();
    }

    /// Collapse multiple top-level nodes into one root.
    ///
    /// Top-level node 0 is nested under top-level node 1, which moves to
    /// index 0, until one root remains. Returns whether anything changed.
    pub fn enforce_one_root(&mut self) -> bool {
        let mut changed = false;
        while self.top_level.len() > 1 {
            let new_root = self.top_level.remove(1);
            let current_root = self.top_level.remove(0);
            self.attach_child(new_root.as_str(), current_root);
            self.top_level.insert(0, new_root);
            changed = true;
        }
        if changed {
            tracing::debug!(root = ?self.root_id(), "enforced single root");
        }
        changed
    }

    // ─── Status ───

    /// Placement status of a node.
    pub fn status(&self, id: &str) -> Option<PlaceStatus> {
        self.nodes.get(id).map(|r| r.status)
    }

    /// Set the placement status of a node.
    pub fn set_status(&mut self, id: &str, status: PlaceStatus) -> Result<(), TreeError> {
        match self.nodes.get_mut(id) {
            Some(record) => {
                record.status = status;
                Ok(())
            }
            None => Err(TreeError::NotFound(NodeId::new(id))),
        }
    }

    /// Ids of nodes with status `Placed`, in node list order.
    pub fn placed_node_list(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, r)| r.status == PlaceStatus::Placed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// True when the tree has nodes and every one of them is placed.
    pub fn are_all_nodes_placed(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.values().all(|r| r.status == PlaceStatus::Placed)
    }

    /// First `NotPlaced` node after `from` in preorder, wrapping around.
    pub fn next_unplaced_id(&self, from: &str) -> Result<Option<NodeId>, TreeError> {
        let order = self.preorder();
        let Some(start) = order.iter().position(|id| id == from) else {
            return Err(TreeError::NotFound(NodeId::new(from)));
        };
        let next = order[start + 1..]
            .iter()
            .chain(order[..start].iter())
            .find(|id| self.status(id.as_str()) == Some(PlaceStatus::NotPlaced))
            .cloned();
        Ok(next)
    }

    // ─── Navigation ───

    /// Record of a node.
    pub fn record(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    /// Whether `id` is in the tree.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Parent of `id`. `None` for top-level or unknown nodes.
    pub fn parent_id(&self, id: &str) -> Option<&NodeId> {
        self.nodes.get(id).and_then(|r| r.parent.as_ref())
    }

    /// Children of `id` in order. Empty for leaves or unknown nodes.
    pub fn children_ids(&self, id: &str) -> &[NodeId] {
        self.nodes.get(id).map(|r| r.children.as_slice()).unwrap_or(&[])
    }

    fn sibling(&self, id: &str, offset: isize) -> Option<&NodeId> {
        let siblings = self.children_ids(self.parent_id(id)?.as_str());
        let index = siblings.iter().position(|c| c == id)? as isize + offset;
        if index < 0 {
            return None;
        }
        siblings.get(index as usize)
    }

    /// Next sibling under the same parent.
    pub fn next_sibling_id(&self, id: &str) -> Option<&NodeId> {
        self.sibling(id, 1)
    }

    /// Previous sibling under the same parent.
    pub fn previous_sibling_id(&self, id: &str) -> Option<&NodeId> {
        self.sibling(id, -1)
    }

    /// First top-level node.
    pub fn root_id(&self) -> Option<&NodeId> {
        self.top_level.first()
    }

    /// All top-level nodes in order.
    pub fn top_level_ids(&self) -> &[NodeId] {
        &self.top_level
    }

    /// Whether `id` is a top-level node.
    pub fn is_root(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|r| r.parent.is_none())
    }

    /// Whether `id` has no children.
    pub fn is_leaf(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|r| r.children.is_empty())
    }

    /// All node ids in first insertion order.
    pub fn node_list(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    /// Iterate over `(id, record)` in node list order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeRecord)> {
        self.nodes.iter()
    }

    /// Leaf ids in node list order.
    pub fn leaf_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, r)| r.children.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of levels on the longest root to leaf path.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack: Vec<(&NodeId, usize)> = self.top_level.iter().map(|id| (id, 1)).collect();
        while let Some((id, level)) = stack.pop() {
            max = max.max(level);
            for child in self.children_ids(id.as_str()) {
                stack.push((child, level + 1));
            }
        }
        max
    }

    // ─── Traversal ───

    /// Parent-first traversal of every top-level subtree.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&NodeId> = self.top_level.iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id.clone());
            stack.extend(self.children_ids(id.as_str()).iter().rev());
        }
        out
    }

    /// Adjacency list of the tree.
    ///
    /// Every top-level node paired with `None`, then for each root all
    /// `(node, child)` edges of a node followed by the edges of each child.
    pub fn tree_parent_list(&self) -> Vec<ParentEdge> {
        let mut out: Vec<ParentEdge> = self
            .top_level
            .iter()
            .map(|id| ParentEdge::new(None, id.clone()))
            .collect();
        for root in &self.top_level {
            self.push_child_edges(root, &mut out);
        }
        out
    }

    fn push_child_edges(&self, id: &NodeId, out: &mut Vec<ParentEdge>) {
        let children = self.children_ids(id.as_str());
        out.extend(
            children
                .iter()
                .map(|child| ParentEdge::new(Some(id.clone()), child.clone())),
        );
        for child in children {
            self.push_child_edges(child, out);
        }
    }

    // ─── Internals ───

    /// Whether `ancestor` is `node` or lies on the path from `node` to its root.
    fn is_ancestor(&self, ancestor: &str, node: &str) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_id(id).map(|p| p.as_str());
        }
        false
    }

    /// Detach an existing node from its parent or the top-level list.
    ///
    /// Its record and subtree stay in the store.
    fn take(&mut self, id: &NodeId) {
        let Some(parent) = self.nodes.get(id.as_str()).map(|r| r.parent.clone()) else {
            return;
        };
        match parent {
            Some(parent) => {
                if let Some(rec) = self.nodes.get_mut(parent.as_str()) {
                    rec.children.retain(|c| c != id);
                }
            }
            None => self.top_level.retain(|c| c != id),
        }
        if let Some(rec) = self.nodes.get_mut(id.as_str()) {
            rec.parent = None;
        }
    }

    /// Append `child` to `parent`'s children, creating the child record if needed.
    fn attach_child(&mut self, parent: &str, child: NodeId) {
        self.nodes.entry(child.clone()).or_default().parent = Some(NodeId::new(parent));
        self.nodes.entry(NodeId::new(parent)).or_default().children.push(child);
    }
}
