//! Editor forms submitted by the node and edge dialogs.

use crate::edge::{ActionSet, EdgeDirection};
use crate::node::{NodeId, NodeType, Verification};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[cfg(feature = "validation")]
use garde::Validate;

/// Node dialog content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct NodeForm {
    #[cfg_attr(feature = "validation", garde(length(min = 1, max = 200)))]
    pub label: String,
    #[cfg_attr(feature = "validation", garde(skip))]
    pub node_type: NodeType,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub description: String,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub screenshot: Option<String>,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub depth: u32,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub parent: Vec<NodeId>,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub verifications: Vec<Verification>,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub priority: Option<String>,
    /// Free-form secondary attributes carried through to the host
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Edge dialog content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct EdgeForm {
    #[cfg_attr(feature = "validation", garde(length(min = 1)))]
    pub edge_id: String,
    /// Forward set first, optional reverse set second
    #[cfg_attr(feature = "validation", garde(length(max = 2)))]
    pub action_sets: Vec<ActionSet>,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub default_action_set_id: String,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub final_wait_time: u64,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub priority: Option<String>,
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub threshold: Option<u64>,
    /// Direction being edited; forward when unspecified
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default)]
    pub direction: Option<EdgeDirection>,
}

impl EdgeForm {
    pub fn direction(&self) -> EdgeDirection {
        self.direction.unwrap_or_default()
    }
}
