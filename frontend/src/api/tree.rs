use navgraph_types::api::{EdgeSaveResponse, NodeSaveResponse, StatusResponse, TreeResponse};
use navgraph_types::{EdgeRecord, NodeRecord, TreeSaveRequest};
use tracing::info;
use urlencoding::encode;

use super::*;

impl ApiClient {
    /// Load a tree with all of its nodes and edges.
    pub async fn get_tree(&self, tree_id: &str) -> ApiResult<TreeContent> {
        let url = self.url(&format!("/server/navigationTrees/{}/full", encode(tree_id)));
        info!("Fetching tree from: {}", url);

        let response: TreeResponse = self.send(self.client.get(&url), "loading tree").await?;
        let tree = response
            .tree
            .ok_or_else(|| ApiError::Decode(format!("Tree {} missing from response", tree_id)))?;

        info!(
            "Loaded tree '{}': {} nodes, {} edges",
            tree.name,
            response.nodes.len(),
            response.edges.len()
        );
        Ok(TreeContent {
            tree,
            nodes: response.nodes,
            edges: response.edges,
            viewport: response.viewport,
        })
    }

    /// Save a single node (`saveNode`).
    pub async fn save_node(&self, tree_id: &str, node: &NodeRecord) -> ApiResult<NodeRecord> {
        let url = self.url(&format!(
            "/server/navigationTrees/{}/nodes/{}",
            encode(tree_id),
            encode(&node.node_id)
        ));
        info!("Saving node '{}' via API: PUT {}", node.label, url);

        let response: NodeSaveResponse = self
            .send(self.client.put(&url).json(node), "saving node")
            .await?;
        response
            .node
            .ok_or_else(|| ApiError::Decode("Saved node missing from response".to_string()))
    }

    /// Save a single edge (`saveEdge`).
    pub async fn save_edge(&self, tree_id: &str, edge: &EdgeRecord) -> ApiResult<EdgeRecord> {
        let url = self.url(&format!(
            "/server/navigationTrees/{}/edges/{}",
            encode(tree_id),
            encode(&edge.edge_id)
        ));
        info!("Saving edge {} via API: PUT {}", edge.edge_id, url);

        let response: EdgeSaveResponse = self
            .send(self.client.put(&url).json(edge), "saving edge")
            .await?;
        response
            .edge
            .ok_or_else(|| ApiError::Decode("Saved edge missing from response".to_string()))
    }

    /// Save a diff of a tree (`saveTreeData`).
    pub async fn save_tree_data(&self, tree_id: &str, request: &TreeSaveRequest) -> ApiResult<()> {
        info!(
            "Saving tree {}: {} nodes, {} edges, {} deleted nodes, {} deleted edges",
            tree_id,
            request.nodes.len(),
            request.edges.len(),
            request.deleted_node_ids.len(),
            request.deleted_edge_ids.len()
        );

        let _: StatusResponse = self
            .post_json(
                &format!("/server/navigationTrees/{}/batch-save", encode(tree_id)),
                request,
                "saving tree",
            )
            .await?;
        Ok(())
    }
}
