//! Segment pairing strategies.
//!
//! A strategy turns a finished [`BranchTree`] and the positions of its nodes
//! into the list of [`WorkUnit`]s handed to the segmentation engine.
//!
//! ## Strategies
//!
//! Given
//!
//! ```text
//! n0
//!  |_ n10
//!  |_ n11
//!      |_ n20
//!      |_ n21
//!          |_ n31
//! ```
//!
//! - **AllInOne**: one unit, seeds `[n0, n11, n21]`, ends `[n10, n20, n31]`
//! - **OnePerBranch**: `(n0, n10) (n0, n11) (n11, n20) (n11, n21) (n21, n31)`
//! - **OnePerParentAndSubChild**: `(n0, n10) (n0, n20) (n0, n21) (n11, n31)`
//! - **OnePerContinuousBranch**: `[n0, n10] [n0, n11] [n11, n20] [n11, n21, n31]`
//!
//! Every strategy requires a non-empty tree with a single root and a position
//! for every node it visits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::tree::{BranchTree, TreeError};
use crate::types::{NodeId, Position, PositionMap, SeedPath, WorkUnit};

/// Error type for pairing strategies.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PairingError {
    /// A visited node has no position.
    #[error("No position for node: {0}")]
    MissingPosition(NodeId),

    /// The tree has no node.
    #[error("Cannot pair an empty tree")]
    EmptyTree,

    /// The tree has several top-level nodes.
    #[error("Tree has {0} roots, expected one")]
    MultipleRoots(usize),

    /// Underlying tree error.
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Converts a branch tree into engine work units.
pub trait SegmentPairingStrategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Plan the work units for `tree`.
    fn work_units(&self, tree: &BranchTree, positions: &PositionMap) -> Result<Vec<WorkUnit>, PairingError>;
}

/// Available pairing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Single unit over the whole tree.
    AllInOne,
    /// One unit per parent / child edge.
    OnePerBranch,
    /// One unit per node / grandchild pair.
    OnePerParentAndSubChild,
    /// One unit per chain between branching points.
    OnePerContinuousBranch,
}

impl StrategyKind {
    /// Every strategy, in menu order.
    pub const ALL: [StrategyKind; 4] = [
        Self::OnePerContinuousBranch,
        Self::OnePerBranch,
        Self::OnePerParentAndSubChild,
        Self::AllInOne,
    ];

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::OnePerContinuousBranch => "One vessel per branch",
            Self::OnePerBranch => "One vessel per parent child",
            Self::OnePerParentAndSubChild => "One vessel per parent and sub child",
            Self::AllInOne => "One vessel for whole tree",
        }
    }

    /// Build the strategy.
    pub fn strategy(&self) -> Box<dyn SegmentPairingStrategy> {
        match self {
            Self::AllInOne => Box::new(AllInOne),
            Self::OnePerBranch => Box::new(OnePerBranch),
            Self::OnePerParentAndSubChild => Box::new(OnePerParentAndSubChild),
            Self::OnePerContinuousBranch => Box::new(OnePerContinuousBranch),
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::OnePerContinuousBranch
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllInOne => write!(f, "all_in_one"),
            Self::OnePerBranch => write!(f, "one_per_branch"),
            Self::OnePerParentAndSubChild => write!(f, "one_per_parent_and_sub_child"),
            Self::OnePerContinuousBranch => write!(f, "one_per_continuous_branch"),
        }
    }
}

/// Returned when a strategy name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown pairing strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    /// Accepts the snake_case names and the human readable labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.to_string() == lowered || k.label().to_lowercase() == lowered)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

// ─── Helpers ───

fn single_root(tree: &BranchTree) -> Result<&NodeId, PairingError> {
    match tree.top_level_ids() {
        [] => Err(PairingError::EmptyTree),
        [root] => Ok(root),
        roots => Err(PairingError::MultipleRoots(roots.len())),
    }
}

fn located(positions: &PositionMap, id: &NodeId) -> Result<(NodeId, Position), PairingError> {
    positions
        .get(id)
        .map(|pos| (id.clone(), *pos))
        .ok_or_else(|| PairingError::MissingPosition(id.clone()))
}

fn pair(positions: &PositionMap, seed: &NodeId, end: &NodeId) -> Result<WorkUnit, PairingError> {
    Ok(WorkUnit::pair(located(positions, seed)?, located(positions, end)?))
}

// ─── Strategies ───

/// Non-leaf nodes are seeds, leaves are ends, all in one unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllInOne;

impl SegmentPairingStrategy for AllInOne {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AllInOne
    }

    fn work_units(&self, tree: &BranchTree, positions: &PositionMap) -> Result<Vec<WorkUnit>, PairingError> {
        single_root(tree)?;
        let mut unit = WorkUnit::default();
        for id in tree.node_list() {
            let (id, pos) = located(positions, &id)?;
            if tree.is_leaf(id.as_str()) {
                unit.push_end(id, pos);
            } else {
                unit.push_seed(id, pos);
            }
        }
        Ok(vec![unit])
    }
}

/// One `(parent, child)` unit per edge, in node list order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePerBranch;

impl SegmentPairingStrategy for OnePerBranch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OnePerBranch
    }

    fn work_units(&self, tree: &BranchTree, positions: &PositionMap) -> Result<Vec<WorkUnit>, PairingError> {
        single_root(tree)?;
        let mut units = Vec::new();
        for id in tree.node_list() {
            for child in tree.children_ids(id.as_str()) {
                units.push(pair(positions, &id, child)?);
            }
        }
        Ok(units)
    }
}

/// Pairs each node with its grandchildren.
///
/// Direct children of the root that have no children of their own would be
/// skipped by this rule, so they are paired with the root instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePerParentAndSubChild;

impl OnePerParentAndSubChild {
    fn collect(
        tree: &BranchTree,
        positions: &PositionMap,
        start: &NodeId,
        is_root: bool,
        units: &mut Vec<WorkUnit>,
    ) -> Result<(), PairingError> {
        for child in tree.children_ids(start.as_str()) {
            let sub_children = tree.children_ids(child.as_str());
            for sub_child in sub_children {
                units.push(pair(positions, start, sub_child)?);
            }
            if sub_children.is_empty() && is_root {
                units.push(pair(positions, start, child)?);
            }
            Self::collect(tree, positions, child, false, units)?;
        }
        Ok(())
    }
}

impl SegmentPairingStrategy for OnePerParentAndSubChild {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OnePerParentAndSubChild
    }

    fn work_units(&self, tree: &BranchTree, positions: &PositionMap) -> Result<Vec<WorkUnit>, PairingError> {
        let root = single_root(tree)?;
        let mut units = Vec::new();
        Self::collect(tree, positions, root, true, &mut units)?;
        Ok(units)
    }
}

/// One chain per run of single-child nodes.
///
/// From every branching point (and the root), follow each child down while
/// the current node has exactly one child. The chain stops at a leaf or a
/// node with several children, which starts the next chains.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePerContinuousBranch;

impl OnePerContinuousBranch {
    /// Seed paths for the subtree under `start`, depth first.
    pub fn seed_paths(
        tree: &BranchTree,
        positions: &PositionMap,
        start: &NodeId,
    ) -> Result<Vec<SeedPath>, PairingError> {
        let mut paths = Vec::new();
        Self::collect(tree, positions, start, &mut paths)?;
        Ok(paths)
    }

    fn collect(
        tree: &BranchTree,
        positions: &PositionMap,
        start: &NodeId,
        paths: &mut Vec<SeedPath>,
    ) -> Result<(), PairingError> {
        for child in tree.children_ids(start.as_str()) {
            let mut path = SeedPath::new();
            let (id, pos) = located(positions, start)?;
            path.push(id, pos);
            let (id, pos) = located(positions, child)?;
            path.push(id, pos);

            let mut tail = child;
            while let [only] = tree.children_ids(tail.as_str()) {
                let (id, pos) = located(positions, only)?;
                path.push(id, pos);
                tail = only;
            }
            paths.push(path);
            Self::collect(tree, positions, tail, paths)?;
        }
        Ok(())
    }
}

impl SegmentPairingStrategy for OnePerContinuousBranch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OnePerContinuousBranch
    }

    fn work_units(&self, tree: &BranchTree, positions: &PositionMap) -> Result<Vec<WorkUnit>, PairingError> {
        let root = single_root(tree)?;
        let paths = Self::seed_paths(tree, positions, root)?;
        Ok(paths.iter().map(WorkUnit::from).collect())
    }
}
