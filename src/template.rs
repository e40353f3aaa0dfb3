//! Anatomical vein templates.
//!
//! A template is the fixed node layout a wizard starts from: the named
//! branches of the portal venous tree or of the inferior vena cava with its
//! hepatic veins. Users then place one point per node and may insert extra
//! nodes, whose ids are derived from the template ids.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tree::{BranchTree, TreeError};

/// Well known node ids.
pub struct VeinId;

impl VeinId {
    /// Portal vein entry point.
    pub const PORTAL_VEIN_ROOT: &'static str = "PortalVeinRoot";
    /// Portal vein trunk.
    pub const PORTAL_VEIN: &'static str = "PortalVein";
    /// Right portal vein.
    pub const RIGHT_PORTAL_VEIN: &'static str = "RightPortalVein";
    /// Left portal vein.
    pub const LEFT_PORTAL_VEIN: &'static str = "LeftPortalVein";
    /// Anterior branch of the right portal vein.
    pub const ANTERIOR_BRANCH: &'static str = "AnteriorBranch";
    /// Posterior branch of the right portal vein.
    pub const POSTERIOR_BRANCH: &'static str = "PosteriorBranch";
    /// Segment 2 branch.
    pub const SEGMENTAL_BRANCH_2: &'static str = "SegmentalBranch_2";
    /// Segment 3 branch.
    pub const SEGMENTAL_BRANCH_3: &'static str = "SegmentalBranch_3";
    /// Segment 4 branch.
    pub const SEGMENTAL_BRANCH_4: &'static str = "SegmentalBranch_4";
    /// Segment 5 branch.
    pub const SEGMENTAL_BRANCH_5: &'static str = "SegmentalBranch_5";
    /// Segment 6 branch.
    pub const SEGMENTAL_BRANCH_6: &'static str = "SegmentalBranch_6";
    /// Segment 7 branch.
    pub const SEGMENTAL_BRANCH_7: &'static str = "SegmentalBranch_7";
    /// Segment 8 branch.
    pub const SEGMENTAL_BRANCH_8: &'static str = "SegmentalBranch_8";

    /// First optional branch (shared by both templates).
    pub const OPTIONAL_BRANCH_1: &'static str = "OptionalBranch_1";
    /// Second optional branch (shared by both templates).
    pub const OPTIONAL_BRANCH_2: &'static str = "OptionalBranch_2";
    /// Third optional branch (shared by both templates).
    pub const OPTIONAL_BRANCH_3: &'static str = "OptionalBranch_3";

    /// Inferior vena cava entry point.
    pub const INFERIOR_CAVA_VEIN_ROOT: &'static str = "InferiorCavaVeinRoot";
    /// Inferior vena cava trunk.
    pub const INFERIOR_CAVA_VEIN: &'static str = "InferiorCavaVein";
    /// Right hepatic vein.
    pub const RIGHT_HEPATIC_VEIN: &'static str = "RightHepaticVein";
    /// Right branch of the right hepatic vein.
    pub const RIGHT_HEPATIC_VEIN_RIGHT_BRANCH: &'static str = "RightHepaticVein_RightBranch";
    /// Left branch of the right hepatic vein.
    pub const RIGHT_HEPATIC_VEIN_LEFT_BRANCH: &'static str = "RightHepaticVein_LeftBranch";
    /// Median hepatic vein.
    pub const MEDIAN_HEPATIC_VEIN: &'static str = "MedianHepaticVein";
    /// Right branch of the median hepatic vein.
    pub const MEDIAN_HEPATIC_VEIN_RIGHT_BRANCH: &'static str = "MedianHepaticVein_RightBranch";
    /// Left branch of the median hepatic vein.
    pub const MEDIAN_HEPATIC_VEIN_LEFT_BRANCH: &'static str = "MedianHepaticVein_LeftBranch";
    /// Left hepatic vein.
    pub const LEFT_HEPATIC_VEIN: &'static str = "LeftHepaticVein";
    /// Right branch of the left hepatic vein.
    pub const LEFT_HEPATIC_VEIN_RIGHT_BRANCH: &'static str = "LeftHepaticVein_RightBranch";
    /// Left branch of the left hepatic vein.
    pub const LEFT_HEPATIC_VEIN_LEFT_BRANCH: &'static str = "LeftHepaticVein_LeftBranch";

    /// Every template id, in reporting order.
    pub const SORTED_IDS: [&'static str; 27] = [
        Self::PORTAL_VEIN_ROOT,
        Self::PORTAL_VEIN,
        Self::RIGHT_PORTAL_VEIN,
        Self::LEFT_PORTAL_VEIN,
        Self::ANTERIOR_BRANCH,
        Self::POSTERIOR_BRANCH,
        Self::SEGMENTAL_BRANCH_2,
        Self::SEGMENTAL_BRANCH_3,
        Self::SEGMENTAL_BRANCH_4,
        Self::SEGMENTAL_BRANCH_5,
        Self::SEGMENTAL_BRANCH_6,
        Self::SEGMENTAL_BRANCH_7,
        Self::SEGMENTAL_BRANCH_8,
        Self::INFERIOR_CAVA_VEIN_ROOT,
        Self::INFERIOR_CAVA_VEIN,
        Self::RIGHT_HEPATIC_VEIN,
        Self::RIGHT_HEPATIC_VEIN_RIGHT_BRANCH,
        Self::RIGHT_HEPATIC_VEIN_LEFT_BRANCH,
        Self::MEDIAN_HEPATIC_VEIN,
        Self::MEDIAN_HEPATIC_VEIN_RIGHT_BRANCH,
        Self::MEDIAN_HEPATIC_VEIN_LEFT_BRANCH,
        Self::LEFT_HEPATIC_VEIN,
        Self::LEFT_HEPATIC_VEIN_RIGHT_BRANCH,
        Self::LEFT_HEPATIC_VEIN_LEFT_BRANCH,
        Self::OPTIONAL_BRANCH_1,
        Self::OPTIONAL_BRANCH_2,
        Self::OPTIONAL_BRANCH_3,
    ];

    /// Whether `id` is one of the fixed template ids.
    pub fn is_template_id(id: &str) -> bool {
        Self::SORTED_IDS.contains(&id)
    }
}

const PORTAL_BRANCHES: &[(&str, Option<&str>)] = &[
    (VeinId::PORTAL_VEIN_ROOT, None),
    (VeinId::PORTAL_VEIN, Some(VeinId::PORTAL_VEIN_ROOT)),
    (VeinId::RIGHT_PORTAL_VEIN, Some(VeinId::PORTAL_VEIN)),
    (VeinId::LEFT_PORTAL_VEIN, Some(VeinId::PORTAL_VEIN)),
    (VeinId::ANTERIOR_BRANCH, Some(VeinId::RIGHT_PORTAL_VEIN)),
    (VeinId::POSTERIOR_BRANCH, Some(VeinId::RIGHT_PORTAL_VEIN)),
    (VeinId::SEGMENTAL_BRANCH_3, Some(VeinId::LEFT_PORTAL_VEIN)),
    (VeinId::SEGMENTAL_BRANCH_2, Some(VeinId::LEFT_PORTAL_VEIN)),
    (VeinId::SEGMENTAL_BRANCH_4, Some(VeinId::LEFT_PORTAL_VEIN)),
    (VeinId::OPTIONAL_BRANCH_3, Some(VeinId::LEFT_PORTAL_VEIN)),
    (VeinId::SEGMENTAL_BRANCH_8, Some(VeinId::ANTERIOR_BRANCH)),
    (VeinId::SEGMENTAL_BRANCH_5, Some(VeinId::ANTERIOR_BRANCH)),
    (VeinId::OPTIONAL_BRANCH_1, Some(VeinId::ANTERIOR_BRANCH)),
    (VeinId::SEGMENTAL_BRANCH_7, Some(VeinId::POSTERIOR_BRANCH)),
    (VeinId::SEGMENTAL_BRANCH_6, Some(VeinId::POSTERIOR_BRANCH)),
    (VeinId::OPTIONAL_BRANCH_2, Some(VeinId::POSTERIOR_BRANCH)),
];

const INFERIOR_CAVA_BRANCHES: &[(&str, Option<&str>)] = &[
    (VeinId::INFERIOR_CAVA_VEIN_ROOT, None),
    (VeinId::INFERIOR_CAVA_VEIN, Some(VeinId::INFERIOR_CAVA_VEIN_ROOT)),
    (VeinId::RIGHT_HEPATIC_VEIN, Some(VeinId::INFERIOR_CAVA_VEIN)),
    (VeinId::MEDIAN_HEPATIC_VEIN, Some(VeinId::INFERIOR_CAVA_VEIN)),
    (VeinId::LEFT_HEPATIC_VEIN, Some(VeinId::INFERIOR_CAVA_VEIN)),
    (VeinId::RIGHT_HEPATIC_VEIN_RIGHT_BRANCH, Some(VeinId::RIGHT_HEPATIC_VEIN)),
    (VeinId::RIGHT_HEPATIC_VEIN_LEFT_BRANCH, Some(VeinId::RIGHT_HEPATIC_VEIN)),
    (VeinId::OPTIONAL_BRANCH_1, Some(VeinId::RIGHT_HEPATIC_VEIN)),
    (VeinId::MEDIAN_HEPATIC_VEIN_RIGHT_BRANCH, Some(VeinId::MEDIAN_HEPATIC_VEIN)),
    (VeinId::MEDIAN_HEPATIC_VEIN_LEFT_BRANCH, Some(VeinId::MEDIAN_HEPATIC_VEIN)),
    (VeinId::OPTIONAL_BRANCH_2, Some(VeinId::MEDIAN_HEPATIC_VEIN)),
    (VeinId::LEFT_HEPATIC_VEIN_RIGHT_BRANCH, Some(VeinId::LEFT_HEPATIC_VEIN)),
    (VeinId::LEFT_HEPATIC_VEIN_LEFT_BRANCH, Some(VeinId::LEFT_HEPATIC_VEIN)),
    (VeinId::OPTIONAL_BRANCH_3, Some(VeinId::LEFT_HEPATIC_VEIN)),
];

/// Node layout a wizard starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselTemplate {
    /// Portal venous tree.
    Portal,
    /// Inferior vena cava and hepatic veins.
    InferiorCava,
    /// No predefined nodes.
    Empty,
}

impl VesselTemplate {
    /// Parse template from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "portal" => Some(Self::Portal),
            "inferior_cava" | "inferiorcava" | "ivc" => Some(Self::InferiorCava),
            "empty" | "none" => Some(Self::Empty),
            _ => None,
        }
    }

    /// `(child, parent)` pairs in insertion order.
    pub fn branches(&self) -> &'static [(&'static str, Option<&'static str>)] {
        match self {
            Self::Portal => PORTAL_BRANCHES,
            Self::InferiorCava => INFERIOR_CAVA_BRANCHES,
            Self::Empty => &[],
        }
    }

    /// Insert the template nodes into `tree`.
    pub fn apply(&self, tree: &mut BranchTree) -> Result<(), TreeError> {
        for (child, parent) in self.branches() {
            tree.insert_after_node(*child, *parent)?;
        }
        tracing::debug!(template = %self, nodes = tree.len(), "applied vessel template");
        Ok(())
    }

    /// A fresh tree holding only this template.
    pub fn build(&self) -> Result<BranchTree, TreeError> {
        let mut tree = BranchTree::new();
        self.apply(&mut tree)?;
        Ok(tree)
    }
}

impl Default for VesselTemplate {
    fn default() -> Self {
        Self::Portal
    }
}

impl fmt::Display for VesselTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portal => write!(f, "portal"),
            Self::InferiorCava => write!(f, "inferior_cava"),
            Self::Empty => write!(f, "empty"),
        }
    }
}
