//! Placement wizard.
//!
//! The wizard walks a user through placing one point per node of a
//! [`BranchTree`], starting from a [`VesselTemplate`]. It owns the tree and a
//! [`PointSource`] and is the only component that mutates either during
//! interaction.
//!
//! ## States
//!
//! ```text
//!            select NotPlaced node
//! Stopped ───────────────────────────► Placing ──┐ point added:
//!    ▲  ▲                                │   ▲   │ label, mark Placed,
//!    │  │ stop / place mode off /        │   └───┘ advance to next unplaced
//!    │  │ nothing left to place          │
//!    │  └────────────────────────────────┘
//!    │
//!    ├──► InsertBefore (node and parent Placed) ── point added: insert a
//!    │                                             new node above the target
//!    └──► Edit (points unlocked)
//! ```
//!
//! Guarded requests (placing an already placed node, inserting before a node
//! whose parent is not placed, referencing unknown ids) are logged no-ops.

pub mod events;
pub mod render;

pub use events::{EventBus, SubscriptionId, WizardEvent};
pub use render::{NoOpRenderer, RecordedFrame, RecordingRenderer, Renderer};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::export::{to_placed_polyline, vessel_branches, VesselBranches};
use crate::points::{PointError, PointSource};
use crate::template::{VeinId, VesselTemplate};
use crate::tree::{BranchTree, TreeError};
use crate::types::{NodeId, PlaceStatus, Position};

/// Error type for wizard operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    /// Tree operation failed.
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Point source operation failed.
    #[error("Point source error: {0}")]
    Point(#[from] PointError),

    /// A point-added notification arrived but the source holds no point.
    #[error("Point added notification without any point in the source")]
    NoPointAdded,
}

/// Interaction state of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    /// No interaction in progress.
    Stopped,
    /// Each new point places the selected node.
    Placing,
    /// Each new point inserts a node above the selected node.
    InsertBefore,
    /// Points are unlocked and can be dragged.
    Edit,
}

impl InteractionStatus {
    /// Parse status from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stopped" => Some(Self::Stopped),
            "placing" => Some(Self::Placing),
            "insert_before" => Some(Self::InsertBefore),
            "edit" => Some(Self::Edit),
            _ => None,
        }
    }
}

impl Default for InteractionStatus {
    fn default() -> Self {
        Self::Stopped
    }
}

impl fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Placing => write!(f, "placing"),
            Self::InsertBefore => write!(f, "insert_before"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

/// Explicit user requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardCommand {
    /// Select a node (starts placing it if not placed yet).
    RequestSelect(NodeId),
    /// Delete a node.
    RequestDelete(NodeId),
    /// Start inserting nodes above a node.
    RequestInsertBefore(NodeId),
    /// Stop the current interaction.
    StopInteraction,
    /// Enter or leave point edition.
    SetEditEnabled(bool),
}

fn suffix_regex() -> Option<&'static Regex> {
    static SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"^(.*)_(\d+)$").ok()).as_ref()
}

/// Id for a node inserted above `id`.
///
/// Template ids get `_0` appended. Other ids have their trailing `_<n>`
/// incremented, or `_0` appended when they have none. The suffix is
/// incremented as a decimal string, so it never overflows and leading zeros
/// are dropped (`x_007` gives `x_8`).
pub fn next_inserted_id(id: &str) -> NodeId {
    if VeinId::is_template_id(id) {
        return NodeId::new(format!("{id}_0"));
    }
    if let Some(caps) = suffix_regex().and_then(|re| re.captures(id)) {
        if let (Some(base), Some(digits)) = (caps.get(1), caps.get(2)) {
            return NodeId::new(format!("{}_{}", base.as_str(), increment_digits(digits.as_str())));
        }
    }
    NodeId::new(format!("{id}_0"))
}

/// Add one to a string of ASCII digits.
fn increment_digits(digits: &str) -> String {
    let mut out: Vec<char> = digits.trim_start_matches('0').chars().collect();
    let mut i = out.len();
    loop {
        if i == 0 {
            out.insert(0, '1');
            break;
        }
        i -= 1;
        if out[i] == '9' {
            out[i] = '0';
        } else {
            out[i] = char::from(out[i] as u8 + 1);
            break;
        }
    }
    out.into_iter().collect()
}

/// Guided placement of labeled points on a branch tree.
pub struct PlacementWizard<P: PointSource> {
    tree: BranchTree,
    points: P,
    template: VesselTemplate,
    status: InteractionStatus,
    current: Option<NodeId>,
    placement_finished: bool,
    visible: bool,
    renderer: Option<Box<dyn Renderer>>,
    events: EventBus,
}

impl<P: PointSource> PlacementWizard<P> {
    /// Create a wizard over `points`, with the nodes of `template`.
    pub fn new(points: P, template: VesselTemplate) -> Result<Self, WizardError> {
        let mut wizard = Self {
            tree: BranchTree::new(),
            points,
            template,
            status: InteractionStatus::Stopped,
            current: None,
            placement_finished: false,
            visible: true,
            renderer: None,
            events: EventBus::new(),
        };
        wizard.points.set_locked(true);
        template.apply(&mut wizard.tree)?;
        Ok(wizard)
    }

    /// Create a wizard over an existing tree (e.g. a reloaded session).
    ///
    /// Nodes with a labeled point in `points` are marked placed.
    pub fn from_tree(points: P, tree: BranchTree, template: VesselTemplate) -> Self {
        let mut wizard = Self {
            tree,
            points,
            template,
            status: InteractionStatus::Stopped,
            current: None,
            placement_finished: false,
            visible: true,
            renderer: None,
            events: EventBus::new(),
        };
        wizard.points.set_locked(true);
        let placed: Vec<NodeId> = wizard
            .tree
            .node_list()
            .into_iter()
            .filter(|id| wizard.points.position(id.as_str()).is_some())
            .collect();
        for id in placed {
            // Ids come from the tree itself.
            let _ = wizard.tree.set_status(id.as_str(), PlaceStatus::Placed);
        }
        wizard.placement_finished = wizard.tree.are_all_nodes_placed();
        wizard
    }

    /// Attach a renderer and push the current polyline to it.
    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
        self.refresh_renderer();
    }

    // ─── Accessors ───

    /// The branch tree.
    pub fn tree(&self) -> &BranchTree {
        &self.tree
    }

    /// The point source.
    pub fn points(&self) -> &P {
        &self.points
    }

    /// Mutable point source.
    ///
    /// Hosts add points on placement clicks and move them on drags; each such
    /// change must be followed by [`on_point_added`](Self::on_point_added) or
    /// [`on_point_moved`](Self::on_point_moved).
    pub fn points_mut(&mut self) -> &mut P {
        &mut self.points
    }

    /// Template applied on construction and on `clear()`.
    pub fn template(&self) -> VesselTemplate {
        self.template
    }

    /// Current interaction state.
    pub fn status(&self) -> InteractionStatus {
        self.status
    }

    /// Selected node.
    pub fn current_node(&self) -> Option<&NodeId> {
        self.current.as_ref()
    }

    /// Whether every node has been placed at least once since the last clear.
    pub fn is_placement_finished(&self) -> bool {
        self.placement_finished
    }

    /// Whether the tree drawing is shown.
    pub fn is_visible_in_scene(&self) -> bool {
        self.visible
    }

    // ─── Observers ───

    /// Register an observer for wizard events.
    pub fn subscribe(&mut self, observer: impl FnMut(&WizardEvent) + Send + 'static) -> SubscriptionId {
        self.events.subscribe(observer)
    }

    /// Remove an observer.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ─── Commands ───

    /// Dispatch a command.
    pub fn handle(&mut self, command: WizardCommand) {
        tracing::debug!(command = ?command, status = %self.status, "wizard command");
        match command {
            WizardCommand::RequestSelect(id) => self.request_select(id.as_str()),
            WizardCommand::RequestDelete(id) => self.request_delete(id.as_str()),
            WizardCommand::RequestInsertBefore(id) => self.request_insert_before(id.as_str()),
            WizardCommand::StopInteraction => self.stop_interaction(),
            WizardCommand::SetEditEnabled(enabled) => self.set_edit_enabled(enabled),
        }
    }

    /// Select a node.
    ///
    /// A node not placed yet starts placing. Selecting a placed node while
    /// placing stops the interaction. Anything else only moves the selection.
    pub fn request_select(&mut self, id: &str) {
        let Some(node_status) = self.tree.status(id) else {
            tracing::warn!(node = %id, "select ignored: unknown node");
            return;
        };
        self.deactivate_current();
        self.set_current(Some(NodeId::new(id)));

        if node_status == PlaceStatus::NotPlaced {
            self.start_placing();
        } else if self.status == InteractionStatus::Placing && node_status == PlaceStatus::Placed {
            self.stop_interaction();
        }
        self.refresh_renderer();
    }

    /// Start inserting new nodes above `id`.
    ///
    /// Only enabled when `id` and its parent are both placed.
    pub fn request_insert_before(&mut self, id: &str) {
        if !self.tree.contains(id) {
            tracing::warn!(node = %id, "insert before ignored: unknown node");
            return;
        }
        self.deactivate_current();
        self.set_current(Some(NodeId::new(id)));
        self.start_insert_before();
        self.refresh_renderer();
    }

    /// Enter or leave edit mode.
    ///
    /// Enabling is ignored while the selected node has not been placed.
    pub fn set_edit_enabled(&mut self, enabled: bool) {
        if enabled {
            if let Some(status @ (PlaceStatus::NotPlaced | PlaceStatus::Placing)) = self.current_status() {
                tracing::debug!(node = ?self.current, status = %status, "edit ignored: node not placed");
                return;
            }
        }
        self.stop_interaction();
        if enabled {
            self.points.set_locked(false);
            self.set_status(InteractionStatus::Edit);
        }
    }

    /// Stop the current interaction.
    pub fn stop_interaction(&mut self) {
        self.deactivate_current();
        self.points.set_place_mode_enabled(false);
        self.points.set_locked(true);
        self.set_status(InteractionStatus::Stopped);
    }

    /// Delete a node and hide the points that no longer belong to the tree.
    pub fn request_delete(&mut self, id: &str) {
        self.stop_interaction();
        match self.tree.remove_node(id) {
            Ok(true) => {
                tracing::info!(node = %id, remaining = self.tree.len(), "node deleted");
                self.update_node_visibility();
                if self.current.as_ref().map(NodeId::as_str) == Some(id) {
                    self.set_current(None);
                }
                self.events.emit(&WizardEvent::TopologyChanged);
            }
            Ok(false) => {
                tracing::debug!(node = %id, "delete refused: root has several children");
            }
            Err(err) => {
                tracing::warn!(node = %id, error = %err, "delete ignored");
            }
        }
        self.update_placement_finished();
        self.refresh_renderer();
    }

    /// Reparent `id` under `parent` (or make it the root), then collapse the
    /// tree back to a single root.
    pub fn move_node(&mut self, id: &str, parent: Option<&str>) -> Result<(), WizardError> {
        self.stop_interaction();
        if !self.tree.contains(id) {
            return Err(TreeError::NotFound(NodeId::new(id)).into());
        }
        self.tree.insert_after_node(id, parent)?;
        self.tree.enforce_one_root();
        self.events.emit(&WizardEvent::TopologyChanged);
        self.refresh_renderer();
        Ok(())
    }

    // ─── Notifications ───

    /// Handle a point appended to the point source by a placement click.
    pub fn on_point_added(&mut self) -> Result<(), WizardError> {
        let result = match self.status {
            InteractionStatus::Placing => self.place_current_and_activate_next(),
            InteractionStatus::InsertBefore => self.insert_placed_before_current(),
            other => {
                tracing::debug!(status = %other, "point added outside placement, ignored");
                Ok(())
            }
        };
        self.refresh_renderer();
        self.update_placement_finished();
        result
    }

    /// Handle a point moved in the point source.
    pub fn on_point_moved(&mut self) {
        self.refresh_renderer();
    }

    /// Handle the host toggling its placement mode.
    pub fn on_place_mode_changed(&mut self, enabled: bool) {
        if !enabled {
            self.stop_interaction();
        }
    }

    /// Add a point at `position` and process it like a placement click.
    pub fn place_point(&mut self, position: Position) -> Result<(), WizardError> {
        self.points.add_point(position);
        self.on_point_added()
    }

    /// Move the point of `id` and refresh the drawing.
    pub fn move_point(&mut self, id: &str, position: Position) -> Result<(), WizardError> {
        self.points.move_point(id, position)?;
        self.on_point_moved();
        Ok(())
    }

    // ─── Scene ───

    /// Show or hide the tree drawing and the tree's points.
    pub fn set_visible_in_scene(&mut self, visible: bool) {
        self.visible = visible;
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_visible(visible);
        }
        self.update_node_visibility();
    }

    /// Template branches present in the tree with their start and end points.
    pub fn vessel_branches(&self) -> VesselBranches {
        vessel_branches(&self.tree, &self.points.positions())
    }

    /// Reset to the template: drop every node and point.
    pub fn clear(&mut self) -> Result<(), WizardError> {
        self.stop_interaction();
        self.tree.clear();
        self.points.remove_all();
        self.set_current(None);
        self.template.apply(&mut self.tree)?;
        self.placement_finished = false;
        tracing::info!(template = %self.template, nodes = self.tree.len(), "wizard cleared");
        self.events.emit(&WizardEvent::TopologyChanged);
        self.refresh_renderer();
        Ok(())
    }

    // ─── Internals ───

    fn set_status(&mut self, status: InteractionStatus) {
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "interaction changed");
            self.status = status;
            self.events.emit(&WizardEvent::InteractionChanged(status));
        }
    }

    fn set_current(&mut self, id: Option<NodeId>) {
        if self.current != id {
            self.current = id.clone();
            self.events.emit(&WizardEvent::SelectionChanged(id));
        }
    }

    fn current_status(&self) -> Option<PlaceStatus> {
        self.current.as_ref().and_then(|id| self.tree.status(id.as_str()))
    }

    /// Revert transient statuses of the selected node.
    fn deactivate_current(&mut self) {
        let Some(id) = self.current.clone() else {
            return;
        };
        let reverted = match self.tree.status(id.as_str()) {
            Some(PlaceStatus::Placing) => PlaceStatus::NotPlaced,
            Some(PlaceStatus::InsertBefore) => PlaceStatus::Placed,
            _ => return,
        };
        let _ = self.tree.set_status(id.as_str(), reverted);
    }

    fn start_placing(&mut self) {
        let Some(id) = self.current.clone() else {
            return;
        };
        if self.current_status() != Some(PlaceStatus::NotPlaced) {
            return;
        }
        let _ = self.tree.set_status(id.as_str(), PlaceStatus::Placing);
        self.points.set_locked(true);
        self.points.set_place_mode_enabled(true);
        self.set_status(InteractionStatus::Placing);
    }

    fn start_insert_before(&mut self) {
        self.stop_interaction();
        let Some(id) = self.current.clone() else {
            return;
        };
        let node_placed = self.tree.status(id.as_str()) == Some(PlaceStatus::Placed);
        let parent_placed = self
            .tree
            .parent_id(id.as_str())
            .and_then(|p| self.tree.status(p.as_str()))
            == Some(PlaceStatus::Placed);

        if node_placed && parent_placed {
            self.points.set_place_mode_enabled(true);
            let _ = self.tree.set_status(id.as_str(), PlaceStatus::InsertBefore);
            self.set_status(InteractionStatus::InsertBefore);
        } else {
            tracing::debug!(node = %id, node_placed, parent_placed, "insert before not enabled");
        }
    }

    fn place_current_and_activate_next(&mut self) -> Result<(), WizardError> {
        let Some(id) = self.current.clone() else {
            tracing::warn!("point added while placing without a selected node");
            return Ok(());
        };
        let index = self.points.last_point_index().ok_or(WizardError::NoPointAdded)?;
        self.points.set_label(index, &id)?;
        self.tree.set_status(id.as_str(), PlaceStatus::Placed)?;
        tracing::debug!(node = %id, point = index, "node placed");

        match self.tree.next_unplaced_id(id.as_str())? {
            Some(next) => {
                self.tree.set_status(next.as_str(), PlaceStatus::Placing)?;
                self.set_current(Some(next));
            }
            None => {
                tracing::info!(nodes = self.tree.len(), "no node left to place");
                self.points.set_place_mode_enabled(false);
                self.points.set_locked(true);
                self.set_current(None);
                self.set_status(InteractionStatus::Stopped);
            }
        }
        Ok(())
    }

    fn insert_placed_before_current(&mut self) -> Result<(), WizardError> {
        let Some(target) = self.current.clone() else {
            tracing::warn!("point added while inserting without a selected node");
            return Ok(());
        };
        let index = self.points.last_point_index().ok_or(WizardError::NoPointAdded)?;

        let mut inserted = next_inserted_id(target.as_str());
        while self.tree.contains(inserted.as_str()) {
            inserted = next_inserted_id(inserted.as_str());
        }

        self.points.set_label(index, &inserted)?;
        self.tree.set_status(target.as_str(), PlaceStatus::Placed)?;
        self.tree
            .insert_before_node_with_status(inserted.clone(), Some(target.as_str()), PlaceStatus::Placed)?;
        tracing::info!(node = %inserted, before = %target, "node inserted");
        self.events.emit(&WizardEvent::TopologyChanged);

        self.set_current(Some(inserted));
        self.start_insert_before();
        Ok(())
    }

    /// Show the points whose label is in the tree, hide the others.
    fn update_node_visibility(&mut self) {
        for index in 0..self.points.point_count() {
            let in_tree = self
                .points
                .label_at(index)
                .is_some_and(|label| self.tree.contains(label));
            if let Err(err) = self.points.set_point_visible(index, self.visible && in_tree) {
                tracing::warn!(index, error = %err, "point visibility not updated");
            }
        }
    }

    fn update_placement_finished(&mut self) {
        if !self.placement_finished && self.tree.are_all_nodes_placed() {
            self.placement_finished = true;
            tracing::info!(nodes = self.tree.len(), "placement completed");
            self.events.emit(&WizardEvent::PlacementCompleted);
        }
    }

    fn refresh_renderer(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            let polyline = to_placed_polyline(&self.tree, &self.points.positions());
            renderer.set_polyline(&polyline);
        }
    }
}

impl<P: PointSource + fmt::Debug> fmt::Debug for PlacementWizard<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementWizard")
            .field("tree", &self.tree)
            .field("points", &self.points)
            .field("template", &self.template)
            .field("status", &self.status)
            .field("current", &self.current)
            .field("placement_finished", &self.placement_finished)
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::InMemoryPointSource;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn p(x: f64) -> Position {
        Position::new(x, 0.0, 0.0)
    }

    fn portal() -> PlacementWizard<InMemoryPointSource> {
        PlacementWizard::new(InMemoryPointSource::new(), VesselTemplate::Portal).unwrap()
    }

    fn record(wizard: &mut PlacementWizard<InMemoryPointSource>) -> Arc<Mutex<Vec<WizardEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        wizard.subscribe(move |e| sink.lock().push(e.clone()));
        seen
    }

    #[test]
    fn test_next_inserted_id() {
        assert_eq!(next_inserted_id("PortalVein"), "PortalVein_0");
        assert_eq!(next_inserted_id("SegmentalBranch_2"), "SegmentalBranch_2_0");
        assert_eq!(next_inserted_id("PortalVein_0"), "PortalVein_1");
        assert_eq!(next_inserted_id("Node_9"), "Node_10");
        assert_eq!(next_inserted_id("Node"), "Node_0");
        assert_eq!(next_inserted_id("Node_x"), "Node_x_0");
    }

    #[test]
    fn test_next_inserted_id_large_suffix() {
        assert_eq!(next_inserted_id("Node_007"), "Node_8");
        assert_eq!(next_inserted_id("Node_0"), "Node_1");
        assert_eq!(next_inserted_id("Node_999"), "Node_1000");
        assert_eq!(
            next_inserted_id("Node_18446744073709551615"),
            "Node_18446744073709551616"
        );
        assert_eq!(
            next_inserted_id("Node_99999999999999999999999"),
            "Node_100000000000000000000000"
        );
    }

    #[test]
    fn test_initial_state() {
        let wizard = portal();
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert!(wizard.points().is_locked());
        assert_eq!(wizard.tree().len(), 16);
        assert!(!wizard.is_placement_finished());
    }

    #[test]
    fn test_select_unplaced_starts_placing() {
        let mut wizard = portal();
        wizard.handle(WizardCommand::RequestSelect(NodeId::new(VeinId::PORTAL_VEIN)));

        assert_eq!(wizard.status(), InteractionStatus::Placing);
        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN), Some(PlaceStatus::Placing));
        assert!(wizard.points().is_place_mode_enabled());
    }

    #[test]
    fn test_select_other_reverts_placing() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN);
        wizard.request_select(VeinId::LEFT_PORTAL_VEIN);

        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN), Some(PlaceStatus::NotPlaced));
        assert_eq!(wizard.tree().status(VeinId::LEFT_PORTAL_VEIN), Some(PlaceStatus::Placing));
        assert_eq!(wizard.current_node().unwrap(), VeinId::LEFT_PORTAL_VEIN);
    }

    #[test]
    fn test_placing_advances_in_preorder() {
        let mut wizard = portal();
        wizard.request_select(VeinId::RIGHT_PORTAL_VEIN);
        wizard.place_point(p(1.0)).unwrap();

        assert_eq!(wizard.tree().status(VeinId::RIGHT_PORTAL_VEIN), Some(PlaceStatus::Placed));
        assert_eq!(wizard.points().position(VeinId::RIGHT_PORTAL_VEIN), Some(p(1.0)));
        assert_eq!(wizard.current_node().unwrap(), VeinId::ANTERIOR_BRANCH);
        assert_eq!(wizard.tree().status(VeinId::ANTERIOR_BRANCH), Some(PlaceStatus::Placing));
    }

    #[test]
    fn test_select_placed_while_placing_stops() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        assert_eq!(wizard.status(), InteractionStatus::Placing);

        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert!(!wizard.points().is_place_mode_enabled());
        assert!(wizard.points().is_locked());
        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN), Some(PlaceStatus::NotPlaced));
    }

    #[test]
    fn test_point_added_while_stopped_is_ignored() {
        let mut wizard = portal();
        wizard.place_point(p(0.0)).unwrap();
        assert!(wizard.tree().placed_node_list().is_empty());
        assert_eq!(wizard.points().label_at(0), Some("P-1"));
    }

    #[test]
    fn test_insert_before_requires_placed_parent() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        wizard.stop_interaction();

        // PortalVein is not placed.
        wizard.request_insert_before(VeinId::PORTAL_VEIN);
        assert_eq!(wizard.status(), InteractionStatus::Stopped);

        // The root has no parent.
        wizard.request_insert_before(VeinId::PORTAL_VEIN_ROOT);
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN_ROOT), Some(PlaceStatus::Placed));
    }

    #[test]
    fn test_insert_before_chain() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        wizard.place_point(p(1.0)).unwrap();
        wizard.stop_interaction();

        wizard.request_insert_before(VeinId::PORTAL_VEIN);
        assert_eq!(wizard.status(), InteractionStatus::InsertBefore);
        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN), Some(PlaceStatus::InsertBefore));

        wizard.place_point(p(0.5)).unwrap();
        let tree = wizard.tree();
        assert_eq!(tree.parent_id(VeinId::PORTAL_VEIN).unwrap(), "PortalVein_0");
        assert_eq!(tree.parent_id("PortalVein_0").unwrap(), VeinId::PORTAL_VEIN_ROOT);
        assert_eq!(tree.status(VeinId::PORTAL_VEIN), Some(PlaceStatus::Placed));
        assert_eq!(tree.status("PortalVein_0"), Some(PlaceStatus::InsertBefore));
        assert_eq!(wizard.current_node().unwrap(), "PortalVein_0");
        assert_eq!(wizard.status(), InteractionStatus::InsertBefore);

        wizard.place_point(p(0.25)).unwrap();
        assert_eq!(wizard.tree().parent_id("PortalVein_0").unwrap(), "PortalVein_1");
        assert_eq!(wizard.points().position("PortalVein_1"), Some(p(0.25)));

        wizard.stop_interaction();
        assert_eq!(wizard.tree().status("PortalVein_1"), Some(PlaceStatus::Placed));
    }

    #[test]
    fn test_edit_toggle() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);

        // Not placed yet: ignored.
        wizard.set_edit_enabled(true);
        assert_eq!(wizard.status(), InteractionStatus::Placing);
        assert!(wizard.points().is_locked());

        wizard.place_point(p(0.0)).unwrap();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.set_edit_enabled(true);
        assert_eq!(wizard.status(), InteractionStatus::Edit);
        assert!(!wizard.points().is_locked());
        assert!(!wizard.points().is_place_mode_enabled());

        wizard.set_edit_enabled(false);
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert!(wizard.points().is_locked());
    }

    #[test]
    fn test_external_place_mode_off_stops() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN);
        wizard.on_place_mode_changed(true);
        assert_eq!(wizard.status(), InteractionStatus::Placing);

        wizard.on_place_mode_changed(false);
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN), Some(PlaceStatus::NotPlaced));
    }

    #[test]
    fn test_external_place_mode_off_ends_insert_before() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        wizard.place_point(p(1.0)).unwrap();
        wizard.request_insert_before(VeinId::PORTAL_VEIN);
        assert_eq!(wizard.status(), InteractionStatus::InsertBefore);

        wizard.on_place_mode_changed(false);
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN), Some(PlaceStatus::Placed));
        assert!(!wizard.points().is_place_mode_enabled());
        assert!(wizard.points().is_locked());
        assert_eq!(wizard.tree().len(), 16);
    }

    #[test]
    fn test_external_place_mode_off_ends_edit() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.set_edit_enabled(true);
        assert_eq!(wizard.status(), InteractionStatus::Edit);
        assert!(!wizard.points().is_locked());

        wizard.on_place_mode_changed(false);
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert!(wizard.points().is_locked());
        assert_eq!(wizard.tree().status(VeinId::PORTAL_VEIN_ROOT), Some(PlaceStatus::Placed));
    }

    #[test]
    fn test_visibility_follows_scene_and_tree() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        wizard.place_point(p(1.0)).unwrap();
        wizard.stop_interaction();

        wizard.set_visible_in_scene(false);
        assert_eq!(wizard.points().is_visible(VeinId::PORTAL_VEIN_ROOT), Some(false));

        wizard.request_delete(VeinId::PORTAL_VEIN);
        wizard.set_visible_in_scene(true);
        assert_eq!(wizard.points().is_visible(VeinId::PORTAL_VEIN_ROOT), Some(true));
        assert_eq!(wizard.points().is_visible(VeinId::PORTAL_VEIN), Some(false));
    }

    #[test]
    fn test_vessel_branches_mid_placement() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();

        let branches = wizard.vessel_branches();
        assert_eq!(branches.names.len(), 16);
        assert_eq!(branches.start_points, vec![p(0.0)]);
        assert!(branches.end_points.is_empty());
    }

    #[test]
    fn test_delete_hides_point_and_clears_selection() {
        let mut wizard = portal();
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        wizard.place_point(p(1.0)).unwrap();
        let seen = record(&mut wizard);

        wizard.request_select(VeinId::PORTAL_VEIN);
        wizard.handle(WizardCommand::RequestDelete(NodeId::new(VeinId::PORTAL_VEIN)));

        assert!(!wizard.tree().contains(VeinId::PORTAL_VEIN));
        assert_eq!(wizard.points().is_visible(VeinId::PORTAL_VEIN), Some(false));
        assert_eq!(wizard.points().is_visible(VeinId::PORTAL_VEIN_ROOT), Some(true));
        assert!(wizard.current_node().is_none());
        assert!(seen.lock().contains(&WizardEvent::TopologyChanged));
    }

    #[test]
    fn test_delete_branching_root_refused() {
        let mut wizard = portal();
        wizard.request_delete(VeinId::PORTAL_VEIN_ROOT);
        // Root has a single child, so it is removed.
        assert_eq!(wizard.tree().root_id().unwrap(), VeinId::PORTAL_VEIN);

        wizard.request_delete(VeinId::PORTAL_VEIN);
        assert!(wizard.tree().contains(VeinId::PORTAL_VEIN));
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut wizard = portal();
        let seen = record(&mut wizard);
        wizard.request_select("nope");
        wizard.request_insert_before("nope");
        wizard.request_delete("nope");
        assert_eq!(wizard.tree().len(), 16);
        assert!(!seen.lock().iter().any(|e| matches!(e, WizardEvent::SelectionChanged(_))));
    }

    #[test]
    fn test_completion_fires_once_and_resets_on_clear() {
        let mut wizard = portal();
        let seen = record(&mut wizard);
        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        for i in 0..16 {
            wizard.place_point(p(i as f64)).unwrap();
        }
        assert!(wizard.is_placement_finished());
        assert_eq!(wizard.status(), InteractionStatus::Stopped);
        assert!(!wizard.points().is_place_mode_enabled());

        // Extra clicks after completion are ignored.
        wizard.place_point(p(99.0)).unwrap();
        let completions = |seen: &Arc<Mutex<Vec<WizardEvent>>>| {
            seen.lock()
                .iter()
                .filter(|e| **e == WizardEvent::PlacementCompleted)
                .count()
        };
        assert_eq!(completions(&seen), 1);

        wizard.clear().unwrap();
        assert!(!wizard.is_placement_finished());
        assert_eq!(wizard.points().point_count(), 0);
        assert_eq!(wizard.tree().len(), 16);
        assert!(wizard.tree().placed_node_list().is_empty());
    }

    #[test]
    fn test_renderer_follows_placement() {
        let mut wizard = portal();
        let recorder = RecordingRenderer::new();
        wizard.set_renderer(Box::new(recorder.clone()));
        assert!(recorder.frame().polyline.is_empty());

        wizard.request_select(VeinId::PORTAL_VEIN_ROOT);
        wizard.place_point(p(0.0)).unwrap();
        wizard.place_point(p(1.0)).unwrap();
        assert_eq!(recorder.frame().polyline, vec![p(0.0), p(1.0), p(0.0)]);

        wizard.move_point(VeinId::PORTAL_VEIN, p(2.0)).unwrap();
        assert_eq!(recorder.frame().polyline, vec![p(0.0), p(2.0), p(0.0)]);

        wizard.set_visible_in_scene(false);
        assert!(!recorder.frame().visible);
        assert_eq!(wizard.points().is_visible(VeinId::PORTAL_VEIN), Some(false));
    }

    #[test]
    fn test_move_node_reparents() {
        let mut wizard = portal();
        wizard
            .move_node(VeinId::SEGMENTAL_BRANCH_2, Some(VeinId::ANTERIOR_BRANCH))
            .unwrap();
        assert_eq!(
            wizard.tree().parent_id(VeinId::SEGMENTAL_BRANCH_2).unwrap(),
            VeinId::ANTERIOR_BRANCH
        );
        assert!(matches!(
            wizard.move_node(VeinId::PORTAL_VEIN, Some(VeinId::ANTERIOR_BRANCH)),
            Err(WizardError::Tree(TreeError::WouldCreateCycle { .. }))
        ));
    }

    #[test]
    fn test_from_tree_marks_positioned_nodes() {
        let mut tree = VesselTemplate::Empty.build().unwrap();
        tree.insert_after_node("A", None).unwrap();
        tree.insert_after_node("B", Some("A")).unwrap();

        let mut points = InMemoryPointSource::new();
        let i = points.add_point(p(0.0));
        points.set_label(i, &NodeId::new("A")).unwrap();

        let wizard = PlacementWizard::from_tree(points, tree, VesselTemplate::Empty);
        assert_eq!(wizard.tree().status("A"), Some(PlaceStatus::Placed));
        assert_eq!(wizard.tree().status("B"), Some(PlaceStatus::NotPlaced));
        assert!(!wizard.is_placement_finished());
    }
}
