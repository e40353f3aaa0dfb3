//! Node types for the branch tree.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique identifier of a branch point in the vessel tree.
///
/// Node ids double as point labels in the point source, so they are plain
/// strings rather than generated handles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new node id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id and return the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Placement status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceStatus {
    /// No point has been placed for this node yet.
    NotPlaced,
    /// The node is waiting for the next placement click.
    Placing,
    /// A point labeled with this node id exists in the point source.
    Placed,
    /// The next placement click inserts a new node above this one.
    InsertBefore,
}

impl PlaceStatus {
    /// Parse status from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "not_placed" | "notplaced" => Some(Self::NotPlaced),
            "placing" => Some(Self::Placing),
            "placed" => Some(Self::Placed),
            "insert_before" | "insertbefore" => Some(Self::InsertBefore),
            _ => None,
        }
    }
}

impl Default for PlaceStatus {
    fn default() -> Self {
        Self::NotPlaced
    }
}

impl fmt::Display for PlaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPlaced => write!(f, "not_placed"),
            Self::Placing => write!(f, "placing"),
            Self::Placed => write!(f, "placed"),
            Self::InsertBefore => write!(f, "insert_before"),
        }
    }
}

/// A `[parent, child]` pair of the adjacency list.
///
/// Top-level nodes are listed with `parent == None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParentEdge(pub Option<NodeId>, pub NodeId);

impl ParentEdge {
    /// Create a new adjacency pair.
    pub fn new(parent: Option<NodeId>, child: NodeId) -> Self {
        Self(parent, child)
    }

    /// Create a top-level entry.
    pub fn root(child: impl Into<NodeId>) -> Self {
        Self(None, child.into())
    }

    /// Create a parent -> child entry.
    pub fn edge(parent: impl Into<NodeId>, child: impl Into<NodeId>) -> Self {
        Self(Some(parent.into()), child.into())
    }

    /// Parent id, `None` for a top-level entry.
    pub fn parent(&self) -> Option<&NodeId> {
        self.0.as_ref()
    }

    /// Child id.
    pub fn child(&self) -> &NodeId {
        &self.1
    }
}
