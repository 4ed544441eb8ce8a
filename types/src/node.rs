//! Navigation graph nodes (UI screens/states of a device under test).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for a node within a navigation tree.
pub type NodeId = String;

/// Unique identifier for a navigation tree.
pub type TreeId = String;

/// 2-D canvas position (world coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return this position shifted by the given delta.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Kind of UI state a node represents.
///
/// Serialized as a lowercase string. Types this client does not know are kept
/// verbatim in [`NodeType::Other`] so they are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    #[default]
    Screen,
    Menu,
    Action,
    /// Entry point of a tree (the "start" node)
    Entry,
    /// Terminal success node
    Success,
    /// Terminal failure node
    Failure,
    /// Anything the host reports that this client does not know about
    Other(String),
}

impl NodeType {
    /// System nodes are created by the host and cannot be duplicated.
    pub fn is_system(&self) -> bool {
        matches!(self, NodeType::Entry | NodeType::Success | NodeType::Failure)
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Screen => "screen",
            NodeType::Menu => "menu",
            NodeType::Action => "action",
            NodeType::Entry => "entry",
            NodeType::Success => "success",
            NodeType::Failure => "failure",
            NodeType::Other(name) => name,
        }
    }
}

impl From<String> for NodeType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "screen" => NodeType::Screen,
            "menu" => NodeType::Menu,
            "action" => NodeType::Action,
            "entry" => NodeType::Entry,
            "success" => NodeType::Success,
            "failure" => NodeType::Failure,
            _ => NodeType::Other(name),
        }
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A verification run when the device is believed to be on a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Verification {
    /// Verification family (e.g. "image", "text", "adb")
    #[serde(default)]
    pub verification_type: String,
    /// Command executed by the host
    pub command: String,
    /// Command parameters
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Pass condition, if the command needs one (e.g. "contains", "equals")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_condition: Option<String>,
}

/// Display and behavioral attributes of a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Distance from the root node
    #[serde(default)]
    pub depth: u32,
    /// Parent node ids
    #[serde(default)]
    pub parent: Vec<NodeId>,
    #[serde(default)]
    pub verifications: Vec<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default)]
    pub is_root: bool,
    /// Node is owned by an ancestor tree and displayed here by reference
    #[serde(default, rename = "isParentReference")]
    pub is_parent_reference: bool,
    /// Owning tree of a parent-reference node
    #[serde(default, rename = "originalTreeId", skip_serializing_if = "Option::is_none")]
    pub original_tree_id: Option<TreeId>,
    /// Subtree drilled into from this node, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_tree_id: Option<TreeId>,
    /// Secondary attributes the client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A vertex in a navigation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub position: Position,
    pub data: NodeData,
}

impl Node {
    /// Create a node with the given id, type and label.
    pub fn new(
        id: impl Into<NodeId>,
        node_type: NodeType,
        label: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            position,
            data: NodeData {
                label: label.into(),
                ..Default::default()
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.data.label
    }

    pub fn is_root(&self) -> bool {
        self.data.is_root
    }

    /// Whether this node may be copied to the clipboard.
    pub fn is_copyable(&self) -> bool {
        !self.node_type.is_system() && !self.data.is_root
    }

    /// The tree that owns this node, given the tree it is displayed in.
    pub fn owning_tree<'a>(&'a self, displayed_tree: &'a str) -> &'a str {
        match (&self.data.is_parent_reference, &self.data.original_tree_id) {
            (true, Some(original)) => original,
            _ => displayed_tree,
        }
    }
}
