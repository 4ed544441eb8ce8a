//! In-memory host used by unit tests.

use crate::api::{ApiError, ApiResult, HostApi, TreeContent};
use async_trait::async_trait;
use navgraph_types::api::{
    ActionDefinition, ExecuteActionsRequest, ExplorationStepRequest, ExplorationStepResponse,
    VerificationDefinition,
};
use navgraph_types::{EdgeRecord, NavigationStep, NodeRecord, TreeInfo, TreeSaveRequest};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

type EdgeRewrite = Box<dyn Fn(&mut EdgeRecord) + Send + Sync>;

/// Records every call and answers from in-memory state.
#[derive(Default)]
pub struct FakeHost {
    trees: Mutex<HashMap<String, TreeContent>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    failing_after: Mutex<HashMap<String, usize>>,
    pub saved_nodes: Mutex<Vec<(String, NodeRecord)>>,
    pub saved_edges: Mutex<Vec<(String, EdgeRecord)>>,
    pub tree_saves: Mutex<Vec<(String, TreeSaveRequest)>>,
    pub executed: Mutex<Vec<ExecuteActionsRequest>>,
    paths: Mutex<HashMap<String, Vec<NavigationStep>>>,
    exploration: Mutex<VecDeque<ExplorationStepResponse>>,
    edge_rewrite: Mutex<Option<EdgeRewrite>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tree(&self, tree_id: &str, name: &str, nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) {
        self.trees.lock().insert(
            tree_id.to_string(),
            TreeContent {
                tree: TreeInfo {
                    id: tree_id.to_string(),
                    name: name.to_string(),
                    is_root_tree: true,
                    parent_tree_id: None,
                    parent_node_id: None,
                },
                nodes,
                edges,
                viewport: None,
            },
        );
    }

    /// Make the next call to `method` fail with HTTP 500.
    pub fn fail_next(&self, method: &str) {
        self.failing.lock().insert(method.to_string());
    }

    /// Let `calls` more calls to `method` succeed, then fail the next one.
    pub fn fail_after(&self, method: &str, calls: usize) {
        self.failing_after.lock().insert(method.to_string(), calls);
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == method).count()
    }

    pub fn set_path(&self, target: &str, steps: Vec<NavigationStep>) {
        self.paths.lock().insert(target.to_string(), steps);
    }

    pub fn push_exploration_step(&self, step: ExplorationStepResponse) {
        self.exploration.lock().push_back(step);
    }

    /// Let the host alter edges before returning them from `save_edge`.
    pub fn rewrite_saved_edges(&self, f: impl Fn(&mut EdgeRecord) + Send + Sync + 'static) {
        *self.edge_rewrite.lock() = Some(Box::new(f));
    }

    fn record(&self, method: &str) -> ApiResult<()> {
        self.calls.lock().push(method.to_string());
        if self.failing.lock().remove(method) {
            return Err(ApiError::Http(500, String::new()));
        }
        let mut failing_after = self.failing_after.lock();
        if let Some(remaining) = failing_after.get_mut(method) {
            if *remaining == 0 {
                failing_after.remove(method);
                return Err(ApiError::Http(500, String::new()));
            }
            *remaining -= 1;
        }
        Ok(())
    }
}

#[async_trait]
impl HostApi for FakeHost {
    async fn get_tree(&self, tree_id: &str) -> ApiResult<TreeContent> {
        self.record("get_tree")?;
        self.trees
            .lock()
            .get(tree_id)
            .cloned()
            .ok_or_else(|| ApiError::Http(404, format!("tree {} not found", tree_id)))
    }

    async fn save_node(&self, tree_id: &str, node: &NodeRecord) -> ApiResult<NodeRecord> {
        self.record("save_node")?;
        self.saved_nodes
            .lock()
            .push((tree_id.to_string(), node.clone()));
        Ok(node.clone())
    }

    async fn save_edge(&self, tree_id: &str, edge: &EdgeRecord) -> ApiResult<EdgeRecord> {
        self.record("save_edge")?;
        let mut saved = edge.clone();
        if let Some(rewrite) = self.edge_rewrite.lock().as_ref() {
            rewrite(&mut saved);
        }
        self.saved_edges
            .lock()
            .push((tree_id.to_string(), saved.clone()));
        Ok(saved)
    }

    async fn save_tree_data(&self, tree_id: &str, request: &TreeSaveRequest) -> ApiResult<()> {
        self.record("save_tree_data")?;
        self.tree_saves
            .lock()
            .push((tree_id.to_string(), request.clone()));
        Ok(())
    }

    async fn refresh_pathfinding_cache(&self, _tree_id: &str) -> ApiResult<()> {
        self.record("refresh_pathfinding_cache")
    }

    async fn update_cached_node(&self, _tree_id: &str, _node: &NodeRecord) -> ApiResult<()> {
        self.record("update_cached_node")
    }

    async fn update_cached_edge(&self, _tree_id: &str, _edge: &EdgeRecord) -> ApiResult<()> {
        self.record("update_cached_edge")
    }

    async fn preview_path(
        &self,
        _tree_id: &str,
        current_node_id: Option<&str>,
        target_node_id: &str,
    ) -> ApiResult<Vec<NavigationStep>> {
        self.record("preview_path")?;
        if let Some(steps) = self.paths.lock().get(target_node_id) {
            return Ok(steps.clone());
        }
        Ok(vec![NavigationStep {
            step_number: 1,
            from_node_id: current_node_id.unwrap_or("root").to_string(),
            to_node_id: target_node_id.to_string(),
            from_node_label: String::new(),
            to_node_label: String::new(),
            actions: Vec::new(),
            retry_actions: Vec::new(),
            failure_actions: Vec::new(),
            final_wait_time: 0,
        }])
    }

    async fn execute_actions(&self, request: &ExecuteActionsRequest) -> ApiResult<()> {
        self.record("execute_actions")?;
        self.executed.lock().push(request.clone());
        Ok(())
    }

    async fn get_available_actions(
        &self,
        _host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<ActionDefinition>>> {
        self.record("get_available_actions")?;
        let mut actions = BTreeMap::new();
        actions.insert(
            "remote".to_string(),
            vec![ActionDefinition {
                id: "press_key_ok".to_string(),
                label: "OK".to_string(),
                command: "press_key".to_string(),
                action_type: "remote".to_string(),
                params: Default::default(),
                requires_input: false,
                description: String::new(),
            }],
        );
        Ok(actions)
    }

    async fn get_verification_types(
        &self,
        _host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<VerificationDefinition>>> {
        self.record("get_verification_types")?;
        let mut verifications = BTreeMap::new();
        verifications.insert(
            "image".to_string(),
            vec![VerificationDefinition {
                id: "wait_for_image".to_string(),
                label: "Wait for image".to_string(),
                command: "waitForImageToAppear".to_string(),
                verification_type: "image".to_string(),
                params: Default::default(),
                description: String::new(),
            }],
        );
        Ok(verifications)
    }

    async fn exploration_step(
        &self,
        _request: &ExplorationStepRequest,
    ) -> ApiResult<ExplorationStepResponse> {
        self.record("exploration_step")?;
        self.exploration
            .lock()
            .pop_front()
            .ok_or_else(|| ApiError::Rejected("No exploration in progress".to_string()))
    }
}
