//! Local graph commands. None of these talk to the host.

use super::NavigationContext;
use crate::error::{NavigationError, Result};
use navgraph_types::{
    ActionSet, Edge, EdgeData, EdgeId, EdgeKind, EdgeStyle, Node, NodeId, Position, Viewport,
};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Offset applied to pasted nodes so they do not cover the original.
const PASTE_OFFSET: f64 = 50.0;

/// A new connection drawn between two node ports.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn from_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    pub fn to_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }
}

/// Positional/selection delta reported by the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    /// `dragging` is true for intermediate frames and false once the drag ends
    Position {
        id: NodeId,
        position: Position,
        dragging: bool,
    },
    Select { id: NodeId, selected: bool },
}

/// Selection/removal delta reported by the canvas for edges.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Select { id: EdgeId, selected: bool },
    Remove { id: EdgeId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Node(NodeId),
    Edge(EdgeId),
    None,
}

/// Local edits applied through [`NavigationContext::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum GraphCommand {
    Connect(Connection),
    NodeChanges(Vec<NodeChange>),
    AddNode(Node),
    Select(Selection),
    Undo,
    Redo,
    Copy,
    Paste,
    SetViewport(Viewport),
}

impl NavigationContext {
    /// Apply a local command.
    pub fn dispatch(&mut self, command: GraphCommand) -> Result<()> {
        match command {
            GraphCommand::Connect(connection) => self.connect(connection).map(|_| ()),
            GraphCommand::NodeChanges(changes) => {
                self.apply_node_changes(changes);
                Ok(())
            }
            GraphCommand::AddNode(node) => self.add_node(node),
            GraphCommand::Select(selection) => self.select(selection),
            GraphCommand::Undo => {
                self.undo();
                Ok(())
            }
            GraphCommand::Redo => {
                self.redo();
                Ok(())
            }
            GraphCommand::Copy => self.copy_selected(),
            GraphCommand::Paste => {
                self.paste_clipboard();
                Ok(())
            }
            GraphCommand::SetViewport(viewport) => {
                self.viewport = viewport;
                Ok(())
            }
        }
    }

    /// Add an edge, replacing any edge already leaving the same source handle.
    /// Returns the new edge id.
    pub fn connect(&mut self, connection: Connection) -> Result<EdgeId> {
        if connection.source == connection.target {
            return Err(NavigationError::Validation(
                "Cannot connect a node to itself".to_string(),
            ));
        }
        let source_label = self
            .node(&connection.source)
            .ok_or_else(|| NavigationError::node_not_found(&connection.source))?
            .label()
            .to_string();
        let target_label = self
            .node(&connection.target)
            .ok_or_else(|| NavigationError::node_not_found(&connection.target))?
            .label()
            .to_string();

        let before = self.edges.len();
        self.edges.retain(|e| {
            !(e.source == connection.source && e.source_handle == connection.source_handle)
        });
        if self.edges.len() != before {
            debug!(
                "Replaced existing edge from {}:{:?}",
                connection.source, connection.source_handle
            );
            if self
                .selected_edge_id
                .as_deref()
                .is_some_and(|id| self.edge(id).is_none())
            {
                self.selected_edge_id = None;
            }
        }

        let kind = EdgeKind::from_handle(connection.source_handle.as_deref());
        let forward = ActionSet::new(
            format!("{}_to_{}", connection.source, connection.target),
            format!("{} → {}", source_label, target_label),
        );
        let reverse = ActionSet::new(
            format!("{}_to_{}", connection.target, connection.source),
            format!("{} → {}", target_label, source_label),
        );
        let id = format!("edge-{}", Uuid::new_v4().simple());

        self.edges.push(Edge {
            id: id.clone(),
            source: connection.source,
            target: connection.target,
            source_handle: connection.source_handle,
            target_handle: connection.target_handle,
            edge_type: Some(kind.edge_type().to_string()),
            style: Some(EdgeStyle {
                stroke: kind.color().to_string(),
                stroke_width: 2.0,
            }),
            data: EdgeData {
                default_action_set_id: forward.id.clone(),
                action_sets: vec![forward, reverse],
                ..Default::default()
            },
        });
        self.commit();
        Ok(id)
    }

    /// Apply canvas deltas. Only a completed drag is recorded in history.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        let mut drag_finished = false;
        for change in changes {
            match change {
                NodeChange::Position {
                    id,
                    position,
                    dragging,
                } => {
                    let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
                        debug!("Ignoring position change for unknown node {}", id);
                        continue;
                    };
                    node.position = position;
                    drag_finished |= !dragging;
                }
                NodeChange::Select { id, selected } => {
                    if selected {
                        self.selected_node_id = Some(id);
                        self.selected_edge_id = None;
                    } else if self.selected_node_id.as_deref() == Some(id.as_str()) {
                        self.selected_node_id = None;
                    }
                }
            }
        }
        if drag_finished {
            self.commit();
        }
    }

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.node(&node.id).is_some() {
            return Err(NavigationError::Validation(format!(
                "Node {} already exists",
                node.id
            )));
        }
        self.nodes.push(node);
        self.commit();
        Ok(())
    }

    pub fn select(&mut self, selection: Selection) -> Result<()> {
        match selection {
            Selection::Node(id) => {
                if self.node(&id).is_none() {
                    return Err(NavigationError::node_not_found(id));
                }
                self.selected_node_id = Some(id);
                self.selected_edge_id = None;
            }
            Selection::Edge(id) => {
                if self.edge(&id).is_none() {
                    return Err(NavigationError::edge_not_found(id));
                }
                self.selected_edge_id = Some(id);
                self.selected_node_id = None;
            }
            Selection::None => {
                self.selected_node_id = None;
                self.selected_edge_id = None;
            }
        }
        Ok(())
    }

    /// Step back in history. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(snapshot.nodes, snapshot.edges);
        true
    }

    /// Step forward in history. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(snapshot.nodes, snapshot.edges);
        true
    }

    fn restore(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
        self.has_unsaved_changes = true;
        if self.selected_node().is_none() {
            self.selected_node_id = None;
        }
        if self.selected_edge().is_none() {
            self.selected_edge_id = None;
        }
    }

    /// Replace the whole graph with externally supplied content, as one undoable edit.
    ///
    /// The persisted baseline is kept, so the next bulk save sends only the difference.
    pub fn replace_contents(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<()> {
        let mut ids = HashSet::new();
        if let Some(dup) = nodes.iter().find(|n| !ids.insert(n.id.as_str())) {
            return Err(NavigationError::Validation(format!(
                "Duplicate node id {}",
                dup.id
            )));
        }
        if let Some(dangling) = edges
            .iter()
            .find(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
        {
            return Err(NavigationError::Validation(format!(
                "Edge {} references a missing node",
                dangling.id
            )));
        }

        info!("Replacing graph: {} nodes, {} edges", nodes.len(), edges.len());
        self.nodes = nodes;
        self.edges = edges;
        self.selected_node_id = None;
        self.selected_edge_id = None;
        self.close_dialogs();
        self.commit();
        Ok(())
    }

    /// Copy the selected node. System and root nodes cannot be copied.
    pub fn copy_selected(&mut self) -> Result<()> {
        let node = self
            .selected_node()
            .cloned()
            .ok_or_else(|| NavigationError::Validation("No node selected".to_string()))?;
        if !node.is_copyable() {
            return Err(NavigationError::Validation(format!(
                "{} node '{}' cannot be copied",
                node.node_type,
                node.label()
            )));
        }
        info!("Copied node {}", node.id);
        self.clipboard = Some(node);
        Ok(())
    }

    /// Paste the clipboard as a new node. Returns the new node id, if anything was pasted.
    pub fn paste_clipboard(&mut self) -> Option<NodeId> {
        let source = self.clipboard.clone()?;
        let id = format!("node-{}", Uuid::new_v4().simple());

        let mut node = source;
        node.id = id.clone();
        node.position = node.position.offset(PASTE_OFFSET, PASTE_OFFSET);
        node.data.label = format!("{}_copy", node.data.label);
        node.data.is_root = false;
        node.data.is_parent_reference = false;
        node.data.original_tree_id = None;

        self.nodes.push(node);
        self.selected_node_id = Some(id.clone());
        self.selected_edge_id = None;
        self.commit();
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::test_support::Harness;
    use navgraph_types::NodeType;

    #[tokio::test]
    async fn test_one_outgoing_edge_per_handle() {
        let mut h = Harness::with_tree(&["a", "b", "c"]).await;

        h.nav
            .dispatch(GraphCommand::Connect(Connection::new("start", "a").from_handle("success")))
            .unwrap();
        h.nav
            .dispatch(GraphCommand::Connect(Connection::new("start", "b").from_handle("failure")))
            .unwrap();
        h.nav
            .dispatch(GraphCommand::Connect(Connection::new("start", "c").from_handle("success")))
            .unwrap();

        let from_success: Vec<&Edge> = h
            .nav
            .edges()
            .iter()
            .filter(|e| e.source == "start" && e.source_handle.as_deref() == Some("success"))
            .collect();
        assert_eq!(from_success.len(), 1);
        assert_eq!(from_success[0].target, "c");
        assert_eq!(h.nav.edges().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_styles_edge_from_handle() {
        let mut h = Harness::with_tree(&["a"]).await;

        let id = h
            .nav
            .connect(Connection::new("start", "a").from_handle("failure"))
            .unwrap();
        let edge = h.nav.edge(&id).unwrap();

        assert!(id.starts_with("edge-"));
        assert_eq!(edge.edge_type.as_deref(), Some("failure"));
        assert_eq!(edge.style.as_ref().unwrap().stroke, "#ef4444");
        assert_eq!(edge.forward_action_set().unwrap().id, "start_to_a");
        assert_eq!(edge.reverse_action_set().unwrap().id, "a_to_start");
        assert_eq!(edge.data.default_action_set_id, "start_to_a");
        assert!(h.nav.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_connect_unknown_node_fails_without_mutation() {
        let mut h = Harness::with_tree(&["a"]).await;

        let err = h.nav.connect(Connection::new("start", "ghost")).unwrap_err();
        assert!(matches!(err, NavigationError::NotFound { .. }));
        assert!(h.nav.edges().is_empty());
        assert!(!h.nav.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_only_drag_end_is_recorded() {
        let mut h = Harness::with_tree(&["a"]).await;

        h.nav.apply_node_changes(vec![NodeChange::Position {
            id: "a".to_string(),
            position: Position::new(5.0, 5.0),
            dragging: true,
        }]);
        assert!(!h.nav.can_undo());

        h.nav.apply_node_changes(vec![NodeChange::Position {
            id: "a".to_string(),
            position: Position::new(10.0, 10.0),
            dragging: false,
        }]);
        assert!(h.nav.can_undo());
        assert_eq!(h.nav.node("a").unwrap().position, Position::new(10.0, 10.0));
    }

    #[tokio::test]
    async fn test_undo_redo_round_trip() {
        let mut h = Harness::with_tree(&["a", "b"]).await;
        let before = (h.nav.nodes().to_vec(), h.nav.edges().to_vec());

        h.nav.connect(Connection::new("start", "a").from_handle("success")).unwrap();
        h.nav
            .add_node(Node::new("c", NodeType::Menu, "C", Position::new(1.0, 2.0)))
            .unwrap();
        h.nav.apply_node_changes(vec![NodeChange::Position {
            id: "b".to_string(),
            position: Position::new(99.0, 99.0),
            dragging: false,
        }]);
        let after = (h.nav.nodes().to_vec(), h.nav.edges().to_vec());

        for _ in 0..3 {
            assert!(h.nav.undo());
        }
        assert!(!h.nav.undo());
        assert_eq!((h.nav.nodes().to_vec(), h.nav.edges().to_vec()), before);

        for _ in 0..3 {
            assert!(h.nav.redo());
        }
        assert_eq!((h.nav.nodes().to_vec(), h.nav.edges().to_vec()), after);
        assert!(h.nav.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_copy_paste_offsets_and_renames() {
        let mut h = Harness::with_tree(&["a"]).await;

        h.nav.dispatch(GraphCommand::Select(Selection::Node("a".to_string()))).unwrap();
        h.nav.dispatch(GraphCommand::Copy).unwrap();
        let id = h.nav.paste_clipboard().unwrap();

        let original = h.nav.node("a").unwrap().clone();
        let pasted = h.nav.node(&id).unwrap();
        assert_ne!(pasted.id, original.id);
        assert_eq!(pasted.label(), "a_copy");
        assert_eq!(pasted.position, original.position.offset(50.0, 50.0));
        assert_eq!(h.nav.selected_node().map(|n| n.id.as_str()), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_root_node_cannot_be_copied() {
        let mut h = Harness::with_tree(&["a"]).await;

        h.nav.select(Selection::Node("start".to_string())).unwrap();
        assert!(matches!(
            h.nav.dispatch(GraphCommand::Copy),
            Err(NavigationError::Validation(_))
        ));
        assert!(h.nav.clipboard().is_none());
        assert!(h.nav.paste_clipboard().is_none());
    }

    #[tokio::test]
    async fn test_replace_contents_keeps_baseline() {
        let mut h = Harness::with_tree(&["a"]).await;
        let mut nodes = h.nav.nodes().to_vec();
        nodes.retain(|n| n.id != "a");
        nodes.push(Node::new("b", NodeType::Screen, "B", Position::default()));

        h.nav.replace_contents(nodes, Vec::new()).unwrap();
        assert!(h.nav.node("a").is_none());
        assert!(h.nav.has_unsaved_changes());
        assert!(h.nav.initial_state().node("a").is_some());
        assert!(h.nav.undo());
        assert!(h.nav.node("a").is_some());
    }

    #[tokio::test]
    async fn test_replace_contents_rejects_dangling_edge() {
        let mut h = Harness::with_tree(&["a"]).await;
        h.nav.connect(Connection::new("start", "a")).unwrap();
        let edges = h.nav.edges().to_vec();
        let nodes: Vec<Node> = h.nav.nodes().iter().filter(|n| n.id != "a").cloned().collect();

        let err = h.nav.replace_contents(nodes, edges).unwrap_err();
        assert!(err.to_string().contains("missing node"));
        assert!(h.nav.node("a").is_some());
    }
}
