//! Saves: single node, single edge, bulk tree diff and direction deletion.
//!
//! Every write replaces the optimistic local entity with the host's response
//! before the operation counts as complete.

use super::{diff, edge_form_from, Dialog, NavigationContext, SaveStatus};
use crate::error::{NavigationError, Result};
use garde::Validate;
use navgraph_types::{
    Edge, EdgeDirection, EdgeForm, EdgeRecord, Node, NodeForm, NodeRecord, TreeSaveRequest,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

impl NavigationContext {
    /// Create or update a node from the node dialog.
    ///
    /// Parent-reference nodes are written to the tree that owns them.
    pub async fn save_node(&mut self, form: NodeForm) -> Result<Node> {
        match self.save_node_inner(form).await {
            Ok(node) => Ok(node),
            Err(e) => Err(self.fail("Save node", e)),
        }
    }

    async fn save_node_inner(&mut self, form: NodeForm) -> Result<Node> {
        form.validate()?;
        let tree_id = self.require_tree()?;

        let mut node = match &self.dialog {
            Dialog::NodeEditor {
                is_new: true,
                position,
            } => Node::new(
                format!("node-{}", Uuid::new_v4().simple()),
                form.node_type.clone(),
                form.label.clone(),
                *position,
            ),
            _ => self
                .selected_node()
                .cloned()
                .ok_or_else(|| NavigationError::Validation("No node selected".to_string()))?,
        };
        node.node_type = form.node_type;
        node.data.label = form.label;
        node.data.description = form.description;
        node.data.screenshot = form.screenshot;
        node.data.depth = form.depth;
        node.data.parent = form.parent;
        node.data.verifications = form.verifications;
        node.data.priority = form.priority;
        node.data.extra = form.extra;

        let owner = node.owning_tree(&tree_id).to_string();
        self.save_status = SaveStatus::Saving;

        let record = NodeRecord::from(&node);
        let saved_record = self.api.save_node(&owner, &record).await?;
        if let Err(e) = self.api.update_cached_node(&owner, &saved_record).await {
            warn!("Navigation cache update failed for node {}: {}", node.id, e);
        }

        // The host never echoes view-only reference flags
        let owned_copy = saved_record.into_node();
        let mut saved = owned_copy.clone();
        saved.data.is_parent_reference = node.data.is_parent_reference;
        saved.data.original_tree_id = node.data.original_tree_id.clone();

        match self.nodes.iter_mut().find(|n| n.id == saved.id) {
            Some(existing) => *existing = saved.clone(),
            None => self.nodes.push(saved.clone()),
        }
        if owner != tree_id {
            self.parent_chain.update_node(&owner, &owned_copy);
            self.tree_cache.remove(&owner);
        }
        self.parent_chain.update_node(&tree_id, &saved);
        self.tree_cache.remove(&tree_id);
        self.initial_state.upsert_node(saved.clone());

        self.selected_node_id = Some(saved.id.clone());
        self.close_dialogs();
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.succeed(format!("Node '{}' saved", saved.label()));
        Ok(saved)
    }

    /// Save the edge dialog.
    ///
    /// Changing the forward actions of a conditional edge splits it from its group.
    /// Reverse edits only replace the reverse action set.
    pub async fn save_edge(&mut self, form: EdgeForm) -> Result<Edge> {
        match self.save_edge_inner(form).await {
            Ok(edge) => Ok(edge),
            Err(e) => Err(self.fail("Save edge", e)),
        }
    }

    async fn save_edge_inner(&mut self, form: EdgeForm) -> Result<Edge> {
        if form.edge_id.trim().is_empty() {
            return Err(NavigationError::Validation("Edge id is required".to_string()));
        }
        form.validate()?;
        let tree_id = self.require_tree()?;
        let existing = self
            .edge(&form.edge_id)
            .cloned()
            .ok_or_else(|| NavigationError::edge_not_found(&form.edge_id))?;
        let direction = form.direction();

        let mut edge = existing.clone();
        match direction {
            EdgeDirection::Forward => edge.data.action_sets = form.action_sets.clone(),
            EdgeDirection::Reverse => {
                if let Some(reverse) = form.action_sets.get(1) {
                    match edge.action_set_mut(EdgeDirection::Reverse) {
                        Some(current) => *current = reverse.clone(),
                        None => edge.data.action_sets.push(reverse.clone()),
                    }
                }
            }
        }
        if !form.default_action_set_id.is_empty() {
            edge.data.default_action_set_id = form.default_action_set_id.clone();
        }
        edge.data.final_wait_time = form.final_wait_time;
        edge.data.priority = form.priority.clone();
        edge.data.threshold = form.threshold;

        self.save_status = SaveStatus::Saving;

        if direction == EdgeDirection::Forward && existing.is_conditional() {
            let forward_changed = match (existing.forward_action_set(), form.action_sets.first()) {
                (Some(before), Some(after)) => !before.same_content(after),
                (None, None) => false,
                _ => true,
            };
            if forward_changed {
                self.split_conditional_group(&tree_id, &mut edge).await?;
            }
        }

        let saved = self.store_edge(&tree_id, edge).await?;
        self.selected_edge_id = Some(saved.id.clone());
        self.refresh_edge_form(&saved, direction);
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.succeed("Edge saved");
        Ok(saved)
    }

    /// Clear one direction of an edge. Removes the edge when no direction has actions left.
    ///
    /// Returns the persisted edge, or `None` when the edge was removed. A removed
    /// edge is deleted on the host by the next bulk save.
    pub async fn delete_edge_direction(
        &mut self,
        edge_id: &str,
        action_set_id: &str,
    ) -> Result<Option<Edge>> {
        match self.delete_edge_direction_inner(edge_id, action_set_id).await {
            Ok(edge) => Ok(edge),
            Err(e) => Err(self.fail("Delete edge direction", e)),
        }
    }

    async fn delete_edge_direction_inner(
        &mut self,
        edge_id: &str,
        action_set_id: &str,
    ) -> Result<Option<Edge>> {
        let tree_id = self.require_tree()?;
        let mut edge = self
            .edge(edge_id)
            .cloned()
            .ok_or_else(|| NavigationError::edge_not_found(edge_id))?;

        let direction = edge.direction_of(action_set_id);
        match edge.action_set_mut(direction) {
            Some(set) => set.clear(),
            None => {
                return Err(NavigationError::Validation(format!(
                    "Edge {} has no {:?} action set",
                    edge_id, direction
                )))
            }
        }

        if edge.has_no_actions() {
            info!("Both directions of edge {} are empty, removing it", edge_id);
            self.remove_edges_inner(&[edge_id.to_string()]).await?;
            if self.edge_form.as_ref().is_some_and(|f| f.edge_id == edge_id) {
                self.close_dialogs();
            }
            self.succeed("Edge removed");
            return Ok(None);
        }

        self.save_status = SaveStatus::Saving;
        let saved = self.store_edge(&tree_id, edge).await?;
        self.refresh_edge_form(&saved, direction);
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.succeed(format!("{:?} direction cleared", direction));
        Ok(Some(saved))
    }

    /// Send only what changed since the last persisted state.
    ///
    /// Returns the payload that was sent.
    pub async fn save_tree(&mut self) -> Result<TreeSaveRequest> {
        match self.save_tree_inner().await {
            Ok(request) => Ok(request),
            Err(e) => Err(self.fail("Save tree", e)),
        }
    }

    async fn save_tree_inner(&mut self) -> Result<TreeSaveRequest> {
        let tree_id = self.require_tree()?;
        let request =
            diff::compute_tree_diff(&self.initial_state, &self.nodes, &self.edges, self.viewport);
        debug!(
            "Saving tree {}: {} node(s), {} edge(s), {} deleted node(s), {} deleted edge(s)",
            tree_id,
            request.nodes.len(),
            request.edges.len(),
            request.deleted_node_ids.len(),
            request.deleted_edge_ids.len()
        );

        self.save_status = SaveStatus::Saving;
        self.api.save_tree_data(&tree_id, &request).await?;

        self.tree_cache.clear();
        self.preview_cache.invalidate_tree(&tree_id);
        if let Err(e) = self.api.refresh_pathfinding_cache(&tree_id).await {
            warn!("Pathfinding cache refresh failed for tree {}: {}", tree_id, e);
        }

        self.initial_state = self.snapshot();
        self.has_unsaved_changes = false;
        self.parent_chain.store_current(&self.nodes, &self.edges, &self.initial_state, false);
        self.succeed(format!("Tree '{}' saved", self.tree_name));
        Ok(request)
    }

    /// Persist one edge and adopt the host's copy locally.
    pub(super) async fn store_edge(&mut self, tree_id: &str, edge: Edge) -> Result<Edge> {
        let record = EdgeRecord::from(&edge);
        let saved_record = self.api.save_edge(tree_id, &record).await?;
        if let Err(e) = self.api.update_cached_edge(tree_id, &saved_record).await {
            warn!("Navigation cache update failed for edge {}: {}", edge.id, e);
        }
        let saved = saved_record.into_edge();

        match self.edges.iter_mut().find(|e| e.id == saved.id) {
            Some(existing) => *existing = saved.clone(),
            None => self.edges.push(saved.clone()),
        }
        self.initial_state.upsert_edge(saved.clone());
        self.parent_chain.update_edge(tree_id, &saved);
        self.tree_cache.remove(tree_id);
        debug!("Stored edge {}", saved.id);
        Ok(saved)
    }

    fn refresh_edge_form(&mut self, saved: &Edge, direction: EdgeDirection) {
        if self
            .edge_form
            .as_ref()
            .is_some_and(|form| form.edge_id == saved.id)
        {
            self.edge_form = Some(edge_form_from(saved, direction));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use crate::error::NavigationError;
    use crate::navigation::edge_form_from;
    use crate::navigation::test_support::Harness;
    use crate::navigation::{Connection, NodeChange, SaveStatus};
    use navgraph_types::{Action, EdgeDirection, EdgeForm, Node, NodeForm, NodeType, Position};

    fn forward_form(h: &Harness, edge_id: &str) -> EdgeForm {
        h.nav
            .edge(edge_id)
            .map(|e| edge_form_from(e, EdgeDirection::Forward))
            .unwrap()
    }

    #[tokio::test]
    async fn test_bulk_save_sends_only_the_diff() {
        let mut h = Harness::with_tree(&["a", "b"]).await;

        h.nav.apply_node_changes(vec![NodeChange::Position {
            id: "b".to_string(),
            position: Position::new(500.0, 500.0),
            dragging: false,
        }]);
        h.nav
            .add_node(Node::new("c", NodeType::Screen, "C", Position::default()))
            .unwrap();

        let request = h.nav.save_tree().await.unwrap();
        let ids: Vec<&str> = request.nodes.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(request.deleted_node_ids.is_empty());
        assert!(request.viewport.is_some());

        h.nav.remove_nodes(&["a".to_string()]).await.unwrap();
        let request = h.nav.save_tree().await.unwrap();
        assert!(request.nodes.is_empty());
        assert_eq!(request.deleted_node_ids, vec!["a".to_string()]);
        assert!(!h.nav.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_bulk_save_side_effects() {
        let mut h = Harness::with_tree(&["a"]).await;
        h.preview_cache.cache_preview("tree", None, "a", Vec::new());
        h.api.fail_next("refresh_pathfinding_cache");
        h.nav.connect(Connection::new("start", "a").from_handle("success")).unwrap();

        h.nav.save_tree().await.unwrap();

        assert!(h.preview_cache.is_empty());
        assert_eq!(h.api.call_count("refresh_pathfinding_cache"), 1);
        assert_eq!(h.nav.save_status(), SaveStatus::Success);
        assert_eq!(h.nav.success_message(), Some("Tree 'Main' saved"));
        assert_eq!(h.nav.initial_state().edges.len(), 1);

        h.clock.advance(Duration::seconds(4));
        assert_eq!(h.nav.success_message(), None);
    }

    #[tokio::test]
    async fn test_failed_bulk_save_keeps_unsaved_changes() {
        let mut h = Harness::with_tree(&["a"]).await;
        h.nav.connect(Connection::new("start", "a")).unwrap();
        h.api.fail_next("save_tree_data");

        let err = h.nav.save_tree().await.unwrap_err();
        assert!(matches!(err, NavigationError::Api(_)));
        assert!(h.nav.has_unsaved_changes());
        assert_eq!(h.nav.save_status(), SaveStatus::Error);
        assert_eq!(h.nav.error_message(), Some("Save tree failed: HTTP 500"));

        h.clock.advance(Duration::seconds(6));
        assert_eq!(h.nav.error_message(), None);
    }

    #[tokio::test]
    async fn test_save_new_node_from_dialog() {
        let mut h = Harness::with_tree(&[]).await;
        h.nav.open_add_node_dialog(Position::new(40.0, 60.0));

        let node = h
            .nav
            .save_node(NodeForm {
                label: "Settings".to_string(),
                node_type: NodeType::Menu,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(node.id.starts_with("node-"));
        assert_eq!(node.position, Position::new(40.0, 60.0));
        assert_eq!(h.nav.node(&node.id).unwrap().node_type, NodeType::Menu);
        assert!(h.nav.node_form().is_none());
        assert_eq!(h.api.call_count("update_cached_node"), 1);

        // Already persisted, so the next bulk save has nothing to send for it
        let request = h.nav.save_tree().await.unwrap();
        assert!(request.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_save_node_requires_selection() {
        let mut h = Harness::with_tree(&["a"]).await;

        let err = h
            .nav
            .save_node(NodeForm {
                label: "A".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationError::Validation(_)));
        assert_eq!(h.api.call_count("save_node"), 0);
    }

    #[tokio::test]
    async fn test_save_node_rejects_empty_label() {
        let mut h = Harness::with_tree(&["a"]).await;
        h.nav.open_edit_node_dialog("a").unwrap();

        let err = h.nav.save_node(NodeForm::default()).await.unwrap_err();
        assert!(matches!(err, NavigationError::Validation(_)));
        assert!(h.nav.node_form().is_some());
    }

    #[tokio::test]
    async fn test_parent_reference_node_saves_to_owning_tree() {
        let mut h = Harness::with_tree(&["a"]).await;
        h.api.insert_tree("sub", "Sub", Vec::new(), Vec::new());
        h.nav.enter_subtree("sub", "Sub", "a").await.unwrap();

        h.nav.open_edit_node_dialog("a").unwrap();
        let mut form = h.nav.node_form().cloned().unwrap();
        form.label = "Renamed".to_string();
        let saved = h.nav.save_node(form).await.unwrap();

        assert!(saved.data.is_parent_reference);
        let writes = h.api.saved_nodes.lock();
        assert_eq!(writes[0].0, "tree");
        drop(writes);

        let root_level = &h.nav.parent_chain().levels()[0];
        let in_root = root_level.graph.node("a").unwrap();
        assert_eq!(in_root.label(), "Renamed");
        assert!(!in_root.data.is_parent_reference);
    }

    #[tokio::test]
    async fn test_save_edge_adopts_server_copy() {
        let mut h = Harness::with_tree(&["a"]).await;
        let id = h.nav.connect(Connection::new("start", "a")).unwrap();
        h.nav.open_edit_edge_dialog(&id).unwrap();
        h.api.rewrite_saved_edges(|edge| edge.final_wait_time = 2000);

        let mut form = forward_form(&h, &id);
        form.action_sets[0]
            .actions
            .push(Action::new("press_key").with_param("key", "OK"));
        form.final_wait_time = 500;
        let saved = h.nav.save_edge(form).await.unwrap();

        assert_eq!(saved.data.final_wait_time, 2000);
        assert_eq!(h.nav.edge(&id).unwrap().data.final_wait_time, 2000);
        assert_eq!(h.nav.edge_form().unwrap().final_wait_time, 2000);
        assert_eq!(h.nav.selected_edge().map(|e| e.id.as_str()), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_save_edge_requires_edge_id() {
        let mut h = Harness::with_tree(&["a"]).await;

        let err = h.nav.save_edge(EdgeForm::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Edge id is required");
        assert_eq!(h.api.call_count("save_edge"), 0);
    }

    fn grouped_pair(h: &mut Harness) -> (String, String) {
        let first = h.nav.connect(Connection::new("start", "a").from_handle("right")).unwrap();
        let mut second = h.nav.edge(&first).unwrap().clone();
        h.nav.edges.retain(|e| e.id != first);

        let mut first_edge = second.clone();
        first_edge.data.is_conditional = true;
        first_edge.data.is_conditional_primary = true;
        second.id = "edge-second".to_string();
        second.target = "b".to_string();
        second.data.is_conditional = true;
        h.nav.edges.push(first_edge);
        h.nav.edges.push(second);
        (first, "edge-second".to_string())
    }

    #[tokio::test]
    async fn test_forward_edit_splits_conditional_group() {
        let mut h = Harness::with_tree(&["a", "b"]).await;
        let (first, second) = grouped_pair(&mut h);

        let mut form = forward_form(&h, &first);
        form.action_sets[0].actions.push(Action::new("press_key").with_param("key", "UP"));
        let saved = h.nav.save_edge(form).await.unwrap();

        assert!(!saved.is_conditional());
        let forward_id = &saved.forward_action_set().unwrap().id;
        assert!(forward_id.starts_with("actionset-"));
        assert_eq!(&saved.data.default_action_set_id, forward_id);
        assert!(!h.nav.edge(&second).unwrap().is_conditional());
        assert_eq!(h.api.call_count("save_edge"), 2);
    }

    #[tokio::test]
    async fn test_reverse_edit_never_splits_group() {
        let mut h = Harness::with_tree(&["a", "b"]).await;
        let (first, second) = grouped_pair(&mut h);

        let mut form = forward_form(&h, &first);
        form.direction = Some(EdgeDirection::Reverse);
        form.action_sets[1].actions.push(Action::new("press_key").with_param("key", "BACK"));
        let saved = h.nav.save_edge(form).await.unwrap();

        assert!(saved.is_conditional());
        assert_eq!(saved.forward_action_set().unwrap().id, "start_to_a");
        assert!(h.nav.edge(&second).unwrap().is_conditional());
        assert_eq!(h.api.call_count("save_edge"), 1);
    }

    #[tokio::test]
    async fn test_unchanged_forward_content_does_not_split() {
        let mut h = Harness::with_tree(&["a", "b"]).await;
        let (first, second) = grouped_pair(&mut h);

        let mut form = forward_form(&h, &first);
        form.action_sets[0].label = "Renamed".to_string();
        form.priority = Some("p2".to_string());
        h.nav.save_edge(form).await.unwrap();

        assert!(h.nav.edge(&first).unwrap().is_conditional());
        assert!(h.nav.edge(&second).unwrap().is_conditional());
    }

    #[tokio::test]
    async fn test_delete_direction_persists_remaining_direction() {
        let mut h = Harness::with_tree(&["a"]).await;
        let id = h.nav.connect(Connection::new("start", "a")).unwrap();
        let mut edge = h.nav.edge(&id).unwrap().clone();
        edge.data.action_sets[0].actions.push(Action::new("press_key"));
        edge.data.action_sets[1].actions.push(Action::new("press_key"));
        h.nav.edges[0] = edge;

        let saved = h
            .nav
            .delete_edge_direction(&id, "a_to_start")
            .await
            .unwrap()
            .unwrap();
        assert!(saved.reverse_action_set().unwrap().is_empty());
        assert!(!saved.forward_action_set().unwrap().is_empty());
        assert_eq!(h.api.call_count("save_edge"), 1);
    }

    #[tokio::test]
    async fn test_delete_last_direction_removes_edge() {
        let mut h = Harness::with_tree(&["a"]).await;
        let id = h.nav.connect(Connection::new("start", "a")).unwrap();
        let mut edge = h.nav.edge(&id).unwrap().clone();
        edge.data.action_sets[0].actions.push(Action::new("press_key"));
        h.nav.edges[0] = edge;

        let result = h.nav.delete_edge_direction(&id, "start_to_a").await.unwrap();
        assert!(result.is_none());
        assert!(h.nav.edge(&id).is_none());
        assert_eq!(h.api.call_count("save_edge"), 0);
    }

    #[tokio::test]
    async fn test_delete_direction_of_unknown_edge() {
        let mut h = Harness::with_tree(&["a"]).await;
        let err = h.nav.delete_edge_direction("nope", "x").await.unwrap_err();
        assert!(matches!(err, NavigationError::NotFound { .. }));
    }
}
