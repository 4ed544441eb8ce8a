//! Device position tracking and path execution.

use super::NavigationContext;
use crate::error::{NavigationError, Result};
use crate::state::EditorEvent;
use navgraph_types::api::ExecuteActionsRequest;
use navgraph_types::{NavigationStep, NodeId};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

impl NavigationContext {
    /// Make `node_id` the current position and recompute the breadcrumb from the root.
    pub fn on_position_changed(&mut self, node_id: &str) {
        let breadcrumb = self.path_from_root(node_id);
        let node_label = self
            .node(node_id)
            .map(|n| n.label().to_string())
            .unwrap_or_default();
        debug!("Position changed to {} ({} hops from root)", node_id, breadcrumb.len() - 1);

        self.current_node_id = Some(node_id.to_string());
        self.breadcrumb = breadcrumb.clone();
        if let Some(tree_id) = self.tree_id.clone() {
            self.emit(EditorEvent::PositionChanged {
                tree_id,
                node_id: node_id.to_string(),
                node_label,
                breadcrumb,
            });
        }
    }

    /// Shortest root-to-node chain over forward edges. Unreachable nodes stand alone.
    fn path_from_root(&self, node_id: &str) -> Vec<NodeId> {
        let Some(root) = self.root_node().map(|n| n.id.clone()) else {
            return vec![node_id.to_string()];
        };

        let mut came_from: HashMap<&str, &str> = HashMap::new();
        let mut queue = VecDeque::from([root.as_str()]);
        came_from.insert(root.as_str(), root.as_str());
        while let Some(current) = queue.pop_front() {
            if current == node_id {
                let mut path = vec![current.to_string()];
                let mut at = current;
                while at != root {
                    let Some(prev) = came_from.get(at) else { break };
                    at = *prev;
                    path.push(at.to_string());
                }
                path.reverse();
                return path;
            }
            for edge in self.edges.iter().filter(|e| e.source == current) {
                if !came_from.contains_key(edge.target.as_str()) {
                    came_from.insert(edge.target.as_str(), current);
                    queue.push_back(edge.target.as_str());
                }
            }
        }
        vec![node_id.to_string()]
    }

    /// Drive the controlled device to `target_node_id`.
    ///
    /// The path comes from the preview cache when fresh, else from the host. The device
    /// position is advanced after every executed step, so a failure leaves it at the
    /// last node actually reached.
    pub async fn navigate_to(&mut self, target_node_id: &str) -> Result<Vec<NavigationStep>> {
        match self.navigate_to_inner(target_node_id).await {
            Ok(steps) => Ok(steps),
            Err(e) => Err(self.fail("Navigation", e)),
        }
    }

    async fn navigate_to_inner(&mut self, target_node_id: &str) -> Result<Vec<NavigationStep>> {
        let tree_id = self.require_tree()?;
        if self.node(target_node_id).is_none() {
            return Err(NavigationError::node_not_found(target_node_id));
        }
        let (host_name, device_id) = self
            .registry
            .active_device()
            .ok_or_else(|| NavigationError::Validation("No device under control".to_string()))?;

        let current = self.current_node_id.clone();
        let steps = match self
            .preview_cache
            .get_cached_preview(&tree_id, current.as_deref(), target_node_id)
        {
            Some(steps) => steps,
            None => {
                let steps = self
                    .api
                    .preview_path(&tree_id, current.as_deref(), target_node_id)
                    .await?;
                self.preview_cache.cache_preview(
                    &tree_id,
                    current.as_deref(),
                    target_node_id,
                    steps.clone(),
                );
                steps
            }
        };
        if steps.is_empty() && current.as_deref() != Some(target_node_id) {
            return Err(NavigationError::Validation(format!(
                "No path to {}",
                target_node_id
            )));
        }

        info!(
            "Navigating {} on {} to {} ({} steps)",
            device_id,
            host_name,
            target_node_id,
            steps.len()
        );
        for step in &steps {
            if let Err(e) = self.execute_step(&host_name, &device_id, step).await {
                if let Some(reached) = self.current_node_id.clone() {
                    self.on_position_changed(&reached);
                }
                return Err(e);
            }
            self.registry.set_device_position(
                &host_name,
                &device_id,
                &tree_id,
                &step.to_node_id,
                &step.to_node_label,
            );
            self.current_node_id = Some(step.to_node_id.clone());
        }

        let label = self
            .node(target_node_id)
            .map(|n| n.label().to_string())
            .unwrap_or_default();
        self.registry
            .set_device_position(&host_name, &device_id, &tree_id, target_node_id, &label);
        self.on_position_changed(target_node_id);
        Ok(steps)
    }

    async fn execute_step(
        &self,
        host_name: &str,
        device_id: &str,
        step: &NavigationStep,
    ) -> Result<()> {
        if step.actions.is_empty() {
            debug!(
                "Step {} ({} -> {}) has no actions",
                step.step_number, step.from_node_id, step.to_node_id
            );
            return Ok(());
        }
        let request = ExecuteActionsRequest {
            host_name: host_name.to_string(),
            device_id: device_id.to_string(),
            actions: step.actions.clone(),
            retry_actions: step.retry_actions.clone(),
            failure_actions: step.failure_actions.clone(),
            final_wait_time: step.final_wait_time,
        };
        self.api.execute_actions(&request).await?;
        Ok(())
    }
}
