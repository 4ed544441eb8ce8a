use navgraph_types::api::{
    CacheEdgeUpdateRequest, CacheNodeUpdateRequest, CacheRefreshRequest, PathPreviewResponse,
    StatusResponse,
};
use navgraph_types::{EdgeRecord, NavigationStep, NodeRecord};
use tracing::debug;
use urlencoding::encode;

use super::*;

impl ApiClient {
    /// Rebuild the host-side pathfinding cache for a tree.
    pub async fn refresh_pathfinding_cache(&self, tree_id: &str) -> ApiResult<()> {
        let request = CacheRefreshRequest {
            tree_id: tree_id.to_string(),
        };
        let _: StatusResponse = self
            .post_json(
                "/server/pathfinding/cache/refresh",
                &request,
                "refreshing pathfinding cache",
            )
            .await?;
        Ok(())
    }

    /// Patch one node in the host-side navigation cache.
    pub async fn update_cached_node(&self, tree_id: &str, node: &NodeRecord) -> ApiResult<()> {
        let request = CacheNodeUpdateRequest {
            tree_id: tree_id.to_string(),
            node: node.clone(),
        };
        let _: StatusResponse = self
            .post_json(
                "/server/navigation/cache/update-node",
                &request,
                "updating cached node",
            )
            .await?;
        Ok(())
    }

    /// Patch one edge in the host-side navigation cache.
    pub async fn update_cached_edge(&self, tree_id: &str, edge: &EdgeRecord) -> ApiResult<()> {
        let request = CacheEdgeUpdateRequest {
            tree_id: tree_id.to_string(),
            edge: edge.clone(),
        };
        let _: StatusResponse = self
            .post_json(
                "/server/navigation/cache/update-edge",
                &request,
                "updating cached edge",
            )
            .await?;
        Ok(())
    }

    /// Compute the navigation path to a target node.
    pub async fn preview_path(
        &self,
        tree_id: &str,
        current_node_id: Option<&str>,
        target_node_id: &str,
    ) -> ApiResult<Vec<NavigationStep>> {
        let mut url = self.url(&format!(
            "/server/pathfinding/preview/{}/{}",
            encode(tree_id),
            encode(target_node_id)
        ));
        if let Some(current) = current_node_id {
            url.push_str(&format!("?current_node_id={}", encode(current)));
        }
        debug!("Fetching path preview: {}", url);

        let response: PathPreviewResponse =
            self.send(self.client.get(&url), "previewing path").await?;
        Ok(response.transitions)
    }
}
