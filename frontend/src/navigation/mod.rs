//! Graph state core: the live navigation graph of one tree and its sync with the host.
//!
//! `NavigationContext` owns nodes, edges, selection, dialog state, undo history and
//! the parent chain. Local edits go through [`GraphCommand`]s; anything that talks
//! to the host is an async method that records a status banner and re-raises errors.

mod commands;
mod conditional;
pub mod diff;
mod history;
mod loading;
mod parent_chain;
mod persistence;
mod position;

pub use commands::{Connection, EdgeChange, GraphCommand, NodeChange, Selection};
pub use history::{GraphSnapshot, History};
pub use parent_chain::{ParentChain, TreeLevel};

use crate::api::HostApi;
use crate::clock::Clock;
use crate::error::NavigationError;
use crate::preview_cache::PreviewCache;
use crate::registry::DeviceRegistry;
use crate::state::EditorEvent;
use crate::EditorSettings;
use chrono::{DateTime, Utc};
use navgraph_types::{
    Edge, EdgeDirection, EdgeForm, Node, NodeForm, NodeId, Position, TreeId, Viewport,
};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Lifecycle of the most recent save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Success,
    Error,
}

/// Which editor dialog is open.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Dialog {
    #[default]
    None,
    /// Node editor; `is_new` when creating a node at `position`
    NodeEditor { is_new: bool, position: Position },
    EdgeEditor,
}

#[derive(Debug, Clone)]
struct Banner {
    message: String,
    expires_at: DateTime<Utc>,
}

impl Banner {
    fn live(&self, now: DateTime<Utc>) -> Option<&str> {
        (now < self.expires_at).then_some(self.message.as_str())
    }
}

/// Live state of the navigation editor.
pub struct NavigationContext {
    api: Arc<dyn HostApi>,
    registry: DeviceRegistry,
    preview_cache: PreviewCache,
    clock: Arc<dyn Clock>,
    settings: EditorSettings,
    events: Sender<EditorEvent>,

    // Graph
    tree_id: Option<TreeId>,
    tree_name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    viewport: Viewport,
    /// Last persisted state; bulk saves diff against it
    initial_state: GraphSnapshot,
    has_unsaved_changes: bool,
    history: History,
    parent_chain: ParentChain,
    tree_cache: HashMap<TreeId, loading::CachedTree>,
    clipboard: Option<Node>,

    // Position
    current_node_id: Option<NodeId>,
    breadcrumb: Vec<NodeId>,

    // UI
    selected_node_id: Option<NodeId>,
    selected_edge_id: Option<String>,
    dialog: Dialog,
    node_form: Option<NodeForm>,
    edge_form: Option<EdgeForm>,

    save_status: SaveStatus,
    success_banner: Option<Banner>,
    error_banner: Option<Banner>,
}

impl NavigationContext {
    pub fn new(
        api: Arc<dyn HostApi>,
        registry: DeviceRegistry,
        preview_cache: PreviewCache,
        clock: Arc<dyn Clock>,
        settings: EditorSettings,
        events: Sender<EditorEvent>,
    ) -> Self {
        let history = History::new(GraphSnapshot::default(), settings.history_limit);
        Self {
            api,
            registry,
            preview_cache,
            clock,
            settings,
            events,
            tree_id: None,
            tree_name: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            initial_state: GraphSnapshot::default(),
            has_unsaved_changes: false,
            history,
            parent_chain: ParentChain::default(),
            tree_cache: HashMap::new(),
            clipboard: None,
            current_node_id: None,
            breadcrumb: Vec::new(),
            selected_node_id: None,
            selected_edge_id: None,
            dialog: Dialog::None,
            node_form: None,
            edge_form: None,
            save_status: SaveStatus::Idle,
            success_banner: None,
            error_banner: None,
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn tree_id(&self) -> Option<&str> {
        self.tree_id.as_deref()
    }

    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Baseline the next bulk save is diffed against.
    pub fn initial_state(&self) -> &GraphSnapshot {
        &self.initial_state
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn parent_chain(&self) -> &ParentChain {
        &self.parent_chain
    }

    pub fn clipboard(&self) -> Option<&Node> {
        self.clipboard.as_ref()
    }

    pub fn current_node_id(&self) -> Option<&str> {
        self.current_node_id.as_deref()
    }

    /// Node ids from the root to the current position.
    pub fn breadcrumb(&self) -> &[NodeId] {
        &self.breadcrumb
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected_node_id.as_deref().and_then(|id| self.node(id))
    }

    pub fn selected_edge(&self) -> Option<&Edge> {
        self.selected_edge_id.as_deref().and_then(|id| self.edge(id))
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    pub fn node_form(&self) -> Option<&NodeForm> {
        self.node_form.as_ref()
    }

    pub fn node_form_mut(&mut self) -> Option<&mut NodeForm> {
        self.node_form.as_mut()
    }

    pub fn edge_form(&self) -> Option<&EdgeForm> {
        self.edge_form.as_ref()
    }

    pub fn edge_form_mut(&mut self) -> Option<&mut EdgeForm> {
        self.edge_form.as_mut()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    pub fn is_saving(&self) -> bool {
        self.save_status == SaveStatus::Saving
    }

    /// Success banner, until it expires.
    pub fn success_message(&self) -> Option<&str> {
        let now = self.clock.now();
        self.success_banner.as_ref().and_then(|b| b.live(now))
    }

    /// Error banner, until it expires.
    pub fn error_message(&self) -> Option<&str> {
        let now = self.clock.now();
        self.error_banner.as_ref().and_then(|b| b.live(now))
    }

    // ------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------

    /// Open the node editor to create a node at `position`.
    pub fn open_add_node_dialog(&mut self, position: Position) {
        self.selected_node_id = None;
        self.selected_edge_id = None;
        self.node_form = Some(NodeForm::default());
        self.edge_form = None;
        self.dialog = Dialog::NodeEditor {
            is_new: true,
            position,
        };
    }

    /// Open the node editor on an existing node.
    pub fn open_edit_node_dialog(&mut self, node_id: &str) -> crate::error::Result<()> {
        let node = self
            .node(node_id)
            .ok_or_else(|| NavigationError::node_not_found(node_id))?;
        let form = NodeForm {
            label: node.data.label.clone(),
            node_type: node.node_type.clone(),
            description: node.data.description.clone(),
            screenshot: node.data.screenshot.clone(),
            depth: node.data.depth,
            parent: node.data.parent.clone(),
            verifications: node.data.verifications.clone(),
            priority: node.data.priority.clone(),
            extra: node.data.extra.clone(),
        };
        let position = node.position;

        self.selected_node_id = Some(node_id.to_string());
        self.selected_edge_id = None;
        self.node_form = Some(form);
        self.edge_form = None;
        self.dialog = Dialog::NodeEditor {
            is_new: false,
            position,
        };
        Ok(())
    }

    /// Open the edge editor on the forward direction of an edge.
    pub fn open_edit_edge_dialog(&mut self, edge_id: &str) -> crate::error::Result<()> {
        let edge = self
            .edge(edge_id)
            .ok_or_else(|| NavigationError::edge_not_found(edge_id))?;
        let form = edge_form_from(edge, EdgeDirection::Forward);

        self.selected_edge_id = Some(edge_id.to_string());
        self.selected_node_id = None;
        self.edge_form = Some(form);
        self.node_form = None;
        self.dialog = Dialog::EdgeEditor;
        Ok(())
    }

    pub fn close_dialogs(&mut self) {
        self.dialog = Dialog::None;
        self.node_form = None;
        self.edge_form = None;
    }

    // ------------------------------------------------------------------
    // Internal helpers shared by the submodules
    // ------------------------------------------------------------------

    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::new(self.nodes.clone(), self.edges.clone())
    }

    /// Record a committed change.
    fn commit(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.has_unsaved_changes = true;
    }

    /// Replace the displayed graph and make it the new persisted baseline.
    fn replace_graph(&mut self, graph: GraphSnapshot) {
        self.nodes = graph.nodes.clone();
        self.edges = graph.edges.clone();
        self.history.reset(graph.clone());
        self.initial_state = graph;
        self.has_unsaved_changes = false;
        self.selected_node_id = None;
        self.selected_edge_id = None;
        self.close_dialogs();
    }

    fn require_tree(&self) -> crate::error::Result<TreeId> {
        self.tree_id
            .clone()
            .ok_or_else(|| NavigationError::Validation("No tree loaded".to_string()))
    }

    fn emit(&self, event: EditorEvent) {
        if self.events.send(event).is_err() {
            debug!("No listener for editor events");
        }
    }

    fn succeed(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.save_status = SaveStatus::Success;
        self.success_banner = Some(Banner {
            message: message.clone(),
            expires_at: self.clock.now() + chrono_duration(self.settings.success_banner),
        });
        self.emit(EditorEvent::Saved { message });
    }

    /// Record a failed operation and hand the error back for re-raising.
    fn fail(&mut self, what: &str, err: NavigationError) -> NavigationError {
        error!("{} failed: {}", what, err);
        let message = format!("{} failed: {}", what, err);
        self.save_status = SaveStatus::Error;
        self.error_banner = Some(Banner {
            message: message.clone(),
            expires_at: self.clock.now() + chrono_duration(self.settings.error_banner),
        });
        self.emit(EditorEvent::OperationFailed { message });
        err
    }
}

fn chrono_duration(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Edge dialog content for one direction of an edge.
fn edge_form_from(edge: &Edge, direction: EdgeDirection) -> EdgeForm {
    EdgeForm {
        edge_id: edge.id.clone(),
        action_sets: edge.data.action_sets.clone(),
        default_action_set_id: edge.data.default_action_set_id.clone(),
        final_wait_time: edge.data.final_wait_time,
        priority: edge.data.priority.clone(),
        threshold: edge.data.threshold,
        direction: Some(direction),
    }
}
