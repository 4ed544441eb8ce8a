//! API client for communicating with a navgraph host.

mod cache;
mod control;
mod exploration;
mod tree;

use async_trait::async_trait;
use navgraph_types::api::{
    ActionDefinition, ExecuteActionsRequest, ExplorationStepRequest, ExplorationStepResponse,
    HostResponse, VerificationDefinition,
};
use navgraph_types::{EdgeRecord, NavigationStep, NodeRecord, TreeInfo, TreeSaveRequest, Viewport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Deserialization error
    Decode(String),
    /// Host answered `success: false`
    Rejected(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http(code, msg) if msg.is_empty() => write!(f, "HTTP {}", code),
            ApiError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ApiError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ApiError::Rejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Content of a navigation tree as returned by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeContent {
    pub tree: TreeInfo,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub viewport: Option<Viewport>,
}

/// Host operations the editor depends on.
///
/// [`ApiClient`] is the HTTP implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Load the full content of a tree.
    async fn get_tree(&self, tree_id: &str) -> ApiResult<TreeContent>;

    /// Persist one node; returns the host's authoritative copy.
    async fn save_node(&self, tree_id: &str, node: &NodeRecord) -> ApiResult<NodeRecord>;

    /// Persist one edge; returns the host's authoritative copy.
    async fn save_edge(&self, tree_id: &str, edge: &EdgeRecord) -> ApiResult<EdgeRecord>;

    /// Persist a diff of a tree.
    async fn save_tree_data(&self, tree_id: &str, request: &TreeSaveRequest) -> ApiResult<()>;

    /// Rebuild the host-side pathfinding cache.
    async fn refresh_pathfinding_cache(&self, tree_id: &str) -> ApiResult<()>;

    /// Patch one node in the host-side navigation cache.
    async fn update_cached_node(&self, tree_id: &str, node: &NodeRecord) -> ApiResult<()>;

    /// Patch one edge in the host-side navigation cache.
    async fn update_cached_edge(&self, tree_id: &str, edge: &EdgeRecord) -> ApiResult<()>;

    /// Compute the path from `current_node_id` (root when `None`) to `target_node_id`.
    async fn preview_path(
        &self,
        tree_id: &str,
        current_node_id: Option<&str>,
        target_node_id: &str,
    ) -> ApiResult<Vec<NavigationStep>>;

    /// Execute actions on a device.
    async fn execute_actions(&self, request: &ExecuteActionsRequest) -> ApiResult<()>;

    /// Actions a host supports, grouped by category.
    async fn get_available_actions(
        &self,
        host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<ActionDefinition>>>;

    /// Verification types a host supports, grouped by category.
    async fn get_verification_types(
        &self,
        host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<VerificationDefinition>>>;

    /// Advance an exploration/validation run by one item.
    async fn exploration_step(
        &self,
        request: &ExplorationStepRequest,
    ) -> ApiResult<ExplorationStepResponse>;
}

/// Client for the host REST API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    /// Optional auth token for Bearer authentication
    auth_token: Option<String>,
}

impl ApiClient {
    /// Create a new API client with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::new_with_auth(base_url, None)
    }

    /// Create a new API client with an optional authentication token.
    pub fn new_with_auth(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            auth_token,
        }
    }

    /// Helper to add auth header to a request builder
    pub(super) fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.auth_token {
            builder.header("Authorization", format!("Bearer {}", token))
        } else {
            builder
        }
    }

    /// Get the base URL for the API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a `{success, ...}` envelope.
    pub(super) async fn send<T>(&self, builder: reqwest::RequestBuilder, what: &str) -> ApiResult<T>
    where
        T: DeserializeOwned + HostResponse,
    {
        let response = self.with_auth(builder).send().await.map_err(|e| {
            tracing::error!("Network error while {}: {}", what, e);
            ApiError::Network(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            tracing::error!("HTTP error {} while {}: {}", status, what, text);
            return Err(ApiError::Http(status, text));
        }

        let body: T = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse response while {}: {}", what, e);
            ApiError::Decode(e.to_string())
        })?;

        if !body.success() {
            let msg = body
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Host rejected request while {}", what));
            tracing::warn!("Host rejected request while {}: {}", what, msg);
            return Err(ApiError::Rejected(msg));
        }

        Ok(body)
    }

    pub(super) async fn post_json<B, T>(&self, path: &str, body: &B, what: &str) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + HostResponse,
    {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        self.send(self.client.post(&url).json(body), what).await
    }
}

#[async_trait]
impl HostApi for ApiClient {
    async fn get_tree(&self, tree_id: &str) -> ApiResult<TreeContent> {
        ApiClient::get_tree(self, tree_id).await
    }

    async fn save_node(&self, tree_id: &str, node: &NodeRecord) -> ApiResult<NodeRecord> {
        ApiClient::save_node(self, tree_id, node).await
    }

    async fn save_edge(&self, tree_id: &str, edge: &EdgeRecord) -> ApiResult<EdgeRecord> {
        ApiClient::save_edge(self, tree_id, edge).await
    }

    async fn save_tree_data(&self, tree_id: &str, request: &TreeSaveRequest) -> ApiResult<()> {
        ApiClient::save_tree_data(self, tree_id, request).await
    }

    async fn refresh_pathfinding_cache(&self, tree_id: &str) -> ApiResult<()> {
        ApiClient::refresh_pathfinding_cache(self, tree_id).await
    }

    async fn update_cached_node(&self, tree_id: &str, node: &NodeRecord) -> ApiResult<()> {
        ApiClient::update_cached_node(self, tree_id, node).await
    }

    async fn update_cached_edge(&self, tree_id: &str, edge: &EdgeRecord) -> ApiResult<()> {
        ApiClient::update_cached_edge(self, tree_id, edge).await
    }

    async fn preview_path(
        &self,
        tree_id: &str,
        current_node_id: Option<&str>,
        target_node_id: &str,
    ) -> ApiResult<Vec<NavigationStep>> {
        ApiClient::preview_path(self, tree_id, current_node_id, target_node_id).await
    }

    async fn execute_actions(&self, request: &ExecuteActionsRequest) -> ApiResult<()> {
        ApiClient::execute_actions(self, request).await
    }

    async fn get_available_actions(
        &self,
        host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<ActionDefinition>>> {
        ApiClient::get_available_actions(self, host_name).await
    }

    async fn get_verification_types(
        &self,
        host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<VerificationDefinition>>> {
        ApiClient::get_verification_types(self, host_name).await
    }

    async fn exploration_step(
        &self,
        request: &ExplorationStepRequest,
    ) -> ApiResult<ExplorationStepResponse> {
        ApiClient::exploration_step(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        assert_eq!(ApiError::Http(502, String::new()).to_string(), "HTTP 502");
        assert_eq!(
            ApiError::Http(404, "no such tree".to_string()).to_string(),
            "HTTP 404: no such tree"
        );
        assert_eq!(
            ApiError::Rejected("tree is locked".to_string()).to_string(),
            "tree is locked"
        );
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:5109/");
        assert_eq!(client.base_url(), "http://localhost:5109");
        assert_eq!(client.url("/server/x"), "http://localhost:5109/server/x");
    }
}
