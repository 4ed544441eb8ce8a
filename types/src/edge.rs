//! Navigation graph edges (transitions) and their action sets.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for an edge.
pub type EdgeId = String;

/// A single device action (remote key press, tap, shell command, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    pub command: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Action family as reported by the host (e.g. "remote", "adb", "web")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
}

impl Action {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Add a parameter (builder style).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Ordered actions for one direction of an edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionSet {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub retry_actions: Vec<Action>,
    #[serde(default)]
    pub failure_actions: Vec<Action>,
}

impl ActionSet {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    /// True when no action of any kind is configured.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.retry_actions.is_empty() && self.failure_actions.is_empty()
    }

    /// Compare the executable content of two action sets (ids and labels ignored).
    pub fn same_content(&self, other: &ActionSet) -> bool {
        self.actions == other.actions
            && self.retry_actions == other.retry_actions
            && self.failure_actions == other.failure_actions
    }

    /// Drop every action, keeping identity.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.retry_actions.clear();
        self.failure_actions.clear();
    }
}

/// Which direction of an edge an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    #[default]
    Forward,
    Reverse,
}

/// Visual/semantic kind of an edge, derived from its source handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Success,
    Failure,
    Break,
    Default,
}

impl EdgeKind {
    /// Classify a source handle name.
    pub fn from_handle(handle: Option<&str>) -> Self {
        let Some(handle) = handle else {
            return EdgeKind::Default;
        };
        let handle = handle.to_ascii_lowercase();
        if handle.contains("success") || handle.contains("true") || handle.contains("complete") {
            EdgeKind::Success
        } else if handle.contains("failure") || handle.contains("false") {
            EdgeKind::Failure
        } else if handle.contains("break") {
            EdgeKind::Break
        } else {
            EdgeKind::Default
        }
    }

    /// Stroke color as a hex string.
    pub fn color(&self) -> &'static str {
        match self {
            EdgeKind::Success => "#10b981",
            EdgeKind::Failure => "#ef4444",
            EdgeKind::Break => "#f97316",
            EdgeKind::Default => "#94a3b8",
        }
    }

    /// Renderer edge type.
    pub fn edge_type(&self) -> &'static str {
        match self {
            EdgeKind::Success => "success",
            EdgeKind::Failure => "failure",
            EdgeKind::Break => "break",
            EdgeKind::Default => "smoothstep",
        }
    }
}

/// Stroke styling for a rendered edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub stroke: String,
    #[serde(default = "default_stroke_width", rename = "strokeWidth")]
    pub stroke_width: f32,
}

fn default_stroke_width() -> f32 {
    2.0
}

/// Behavioral attributes of an edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(default)]
    pub label: String,
    /// Index 0 is the forward direction, index 1 (optional) the reverse
    #[serde(default)]
    pub action_sets: Vec<ActionSet>,
    #[serde(default)]
    pub default_action_set_id: String,
    /// Wait after the last action, in milliseconds
    #[serde(default)]
    pub final_wait_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
    #[serde(default)]
    pub is_conditional: bool,
    #[serde(default)]
    pub is_conditional_primary: bool,
}

/// A directed transition between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, rename = "sourceHandle", skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, rename = "targetHandle", skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<EdgeStyle>,
    #[serde(default)]
    pub data: EdgeData,
}

/// Identity of a conditional group: edges sharing source, handle and forward action set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionalGroupKey {
    pub source: NodeId,
    pub source_handle: Option<String>,
    pub action_set_id: String,
}

impl Edge {
    /// The forward action set, if configured.
    pub fn forward_action_set(&self) -> Option<&ActionSet> {
        self.data.action_sets.first()
    }

    /// The reverse action set, if configured.
    pub fn reverse_action_set(&self) -> Option<&ActionSet> {
        self.data.action_sets.get(1)
    }

    /// Mutable access to one direction's action set.
    pub fn action_set_mut(&mut self, direction: EdgeDirection) -> Option<&mut ActionSet> {
        match direction {
            EdgeDirection::Forward => self.data.action_sets.get_mut(0),
            EdgeDirection::Reverse => self.data.action_sets.get_mut(1),
        }
    }

    /// Resolve which direction an action set id belongs to.
    ///
    /// Anything that does not match the forward set is treated as reverse.
    pub fn direction_of(&self, action_set_id: &str) -> EdgeDirection {
        match self.forward_action_set() {
            Some(forward) if forward.id == action_set_id => EdgeDirection::Forward,
            _ => EdgeDirection::Reverse,
        }
    }

    /// True when every configured direction has no actions.
    pub fn has_no_actions(&self) -> bool {
        self.data.action_sets.iter().all(ActionSet::is_empty)
    }

    pub fn is_conditional(&self) -> bool {
        self.data.is_conditional || self.data.is_conditional_primary
    }

    /// Clear both conditional flags.
    pub fn unlink(&mut self) {
        self.data.is_conditional = false;
        self.data.is_conditional_primary = false;
    }

    pub fn kind(&self) -> EdgeKind {
        EdgeKind::from_handle(self.source_handle.as_deref())
    }

    /// Key identifying this edge's conditional group, if it has a forward action set.
    pub fn conditional_group(&self) -> Option<ConditionalGroupKey> {
        self.forward_action_set().map(|set| ConditionalGroupKey {
            source: self.source.clone(),
            source_handle: self.source_handle.clone(),
            action_set_id: set.id.clone(),
        })
    }

    /// Whether this edge belongs to the given conditional group.
    pub fn in_group(&self, key: &ConditionalGroupKey) -> bool {
        self.source == key.source
            && self.source_handle == key.source_handle
            && self
                .forward_action_set()
                .is_some_and(|set| set.id == key.action_set_id)
    }
}
