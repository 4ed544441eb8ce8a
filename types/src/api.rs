//! API request and response types.

use crate::edge::Action;
use crate::node::{NodeId, TreeId};
use crate::tree::{EdgeRecord, NodeRecord, TreeInfo, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "validation")]
use garde::Validate;

/// Common envelope of every host response: `{success, error?, ...}`.
pub trait HostResponse {
    fn success(&self) -> bool;
    fn error_message(&self) -> Option<&str>;
}

macro_rules! host_response {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl HostResponse for $ty {
                fn success(&self) -> bool {
                    self.success
                }

                fn error_message(&self) -> Option<&str> {
                    self.error.as_deref()
                }
            }
        )+
    };
}

// ============================================================================
// Tree API Types
// ============================================================================

/// Full content of a navigation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub tree: Option<TreeInfo>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

/// Result of saving a single node; `node` is the authoritative post-write state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub node: Option<NodeRecord>,
}

/// Result of saving a single edge; `edge` is the authoritative post-write state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub edge: Option<EdgeRecord>,
}

/// Diff-based bulk save of a tree: only changed entities plus deletions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeSaveRequest {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub deleted_node_ids: Vec<NodeId>,
    pub deleted_edge_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl TreeSaveRequest {
    /// True when there is nothing to upsert or delete.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.edges.is_empty()
            && self.deleted_node_ids.is_empty()
            && self.deleted_edge_ids.is_empty()
    }
}

/// Generic `{success, error, message}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Cache API Types
// ============================================================================

/// Request to rebuild the host-side pathfinding cache for a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRefreshRequest {
    pub tree_id: TreeId,
}

/// Request to patch one node in the host-side navigation cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheNodeUpdateRequest {
    pub tree_id: TreeId,
    pub node: NodeRecord,
}

/// Request to patch one edge in the host-side navigation cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEdgeUpdateRequest {
    pub tree_id: TreeId,
    pub edge: EdgeRecord,
}

// ============================================================================
// Navigation API Types
// ============================================================================

/// One transition of a computed navigation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStep {
    pub step_number: u32,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    #[serde(default)]
    pub from_node_label: String,
    #[serde(default)]
    pub to_node_label: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub retry_actions: Vec<Action>,
    #[serde(default)]
    pub failure_actions: Vec<Action>,
    #[serde(default)]
    pub final_wait_time: u64,
}

/// Computed path from the current node to a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPreviewResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub transitions: Vec<NavigationStep>,
}

/// Request to execute actions on a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteActionsRequest {
    pub host_name: String,
    pub device_id: String,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub retry_actions: Vec<Action>,
    #[serde(default)]
    pub failure_actions: Vec<Action>,
    #[serde(default)]
    pub final_wait_time: u64,
}

// ============================================================================
// Capability API Types
// ============================================================================

/// An action a host can perform on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: String,
    pub label: String,
    pub command: String,
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub requires_input: bool,
    #[serde(default)]
    pub description: String,
}

/// A verification a host can run on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationDefinition {
    pub id: String,
    pub label: String,
    pub command: String,
    #[serde(default)]
    pub verification_type: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub description: String,
}

/// Available actions grouped by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableActionsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub actions: BTreeMap<String, Vec<ActionDefinition>>,
}

/// Available verification types grouped by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationTypesResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub verifications: BTreeMap<String, Vec<VerificationDefinition>>,
}

// ============================================================================
// Exploration API Types
// ============================================================================

/// Request for the next item of an exploration/validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct ExplorationStepRequest {
    #[cfg_attr(feature = "validation", garde(length(min = 1)))]
    pub tree_id: TreeId,
    #[cfg_attr(feature = "validation", garde(length(min = 1)))]
    pub host_name: String,
    #[cfg_attr(feature = "validation", garde(length(min = 1)))]
    pub device_id: String,
    #[cfg_attr(feature = "validation", garde(length(min = 1)))]
    pub device_model: String,
    /// Set by the host on the first response and echoed back afterwards
    #[cfg_attr(feature = "validation", garde(skip))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration_id: Option<String>,
}

/// Outcome of one explored/validated item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationItemResult {
    pub item: String,
    pub passed: bool,
    #[serde(default)]
    pub message: String,
}

/// Response for one exploration step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationStepResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub exploration_id: Option<String>,
    #[serde(default)]
    pub has_more_items: bool,
    #[serde(default)]
    pub completed_items: u32,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub result: Option<ExplorationItemResult>,
}

host_response!(
    TreeResponse,
    NodeSaveResponse,
    EdgeSaveResponse,
    StatusResponse,
    PathPreviewResponse,
    AvailableActionsResponse,
    VerificationTypesResponse,
    ExplorationStepResponse,
);
