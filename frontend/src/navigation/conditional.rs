//! Edge/node removal and conditional-group maintenance.
//!
//! Conditional edges share `{source, sourceHandle, forward action set id}`.
//! A group needs at least two members: when removal leaves a single member it
//! is unlinked, and editing the shared forward actions of one member splits
//! the whole group.

use super::commands::EdgeChange;
use super::NavigationContext;
use crate::error::Result;
use navgraph_types::{ConditionalGroupKey, Edge, EdgeDirection, EdgeId, NodeId};
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

impl NavigationContext {
    /// Apply edge deltas from the canvas. Removals are recorded in history and may
    /// persist auto-unlinked siblings.
    pub async fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) -> Result<()> {
        let mut removed = Vec::new();
        for change in changes {
            match change {
                EdgeChange::Select { id, selected } => {
                    if selected {
                        self.selected_edge_id = Some(id);
                        self.selected_node_id = None;
                    } else if self.selected_edge_id.as_deref() == Some(id.as_str()) {
                        self.selected_edge_id = None;
                    }
                }
                EdgeChange::Remove { id } => removed.push(id),
            }
        }
        if removed.is_empty() {
            return Ok(());
        }
        self.remove_edges(&removed).await
    }

    /// Remove edges, then unlink any conditional group left with a single member.
    pub async fn remove_edges(&mut self, ids: &[EdgeId]) -> Result<()> {
        match self.remove_edges_inner(ids).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail("Remove edges", e)),
        }
    }

    pub(super) async fn remove_edges_inner(&mut self, ids: &[EdgeId]) -> Result<()> {
        let removed = self.detach_edges(|e| ids.contains(&e.id));
        if removed.is_empty() {
            return Ok(());
        }
        let result = self.unlink_orphaned_groups(&removed).await;
        self.commit();
        result
    }

    /// Remove nodes together with every edge touching them.
    pub async fn remove_nodes(&mut self, ids: &[NodeId]) -> Result<()> {
        let before = self.nodes.len();
        self.nodes.retain(|n| !ids.contains(&n.id));
        if self.nodes.len() == before {
            return Ok(());
        }
        if self
            .selected_node_id
            .as_ref()
            .is_some_and(|id| ids.contains(id))
        {
            self.selected_node_id = None;
        }
        info!("Removed {} node(s)", before - self.nodes.len());

        let removed = self.detach_edges(|e| ids.contains(&e.source) || ids.contains(&e.target));
        let result = self.unlink_orphaned_groups(&removed).await;
        self.commit();
        result.map_err(|e| self.fail("Remove nodes", e))
    }

    /// Take matching edges out of the graph without touching the host.
    fn detach_edges(&mut self, matches: impl Fn(&Edge) -> bool) -> Vec<Edge> {
        let (removed, kept): (Vec<Edge>, Vec<Edge>) =
            std::mem::take(&mut self.edges).into_iter().partition(|e| matches(e));
        self.edges = kept;
        if self
            .selected_edge_id
            .as_ref()
            .is_some_and(|id| removed.iter().any(|e| &e.id == id))
        {
            self.selected_edge_id = None;
        }
        removed
    }

    /// Unlink the last remaining member of every group the removed edges belonged to.
    async fn unlink_orphaned_groups(&mut self, removed: &[Edge]) -> Result<()> {
        let groups: HashSet<ConditionalGroupKey> = removed
            .iter()
            .filter(|e| e.is_conditional())
            .filter_map(Edge::conditional_group)
            .collect();
        if groups.is_empty() {
            return Ok(());
        }

        let mut orphans = Vec::new();
        for key in &groups {
            let members: Vec<&Edge> = self.edges.iter().filter(|e| e.in_group(key)).collect();
            if let [last] = members.as_slice() {
                if last.is_conditional() {
                    orphans.push((*last).clone());
                }
            }
        }
        if orphans.is_empty() {
            return Ok(());
        }

        let tree_id = self.require_tree()?;
        for mut edge in orphans {
            info!("Unlinking edge {}: last member of its conditional group", edge.id);
            edge.unlink();
            self.store_edge(&tree_id, edge).await?;
        }
        Ok(())
    }

    /// Split `edge` out of its conditional group before its forward actions change.
    ///
    /// Every sibling is unlinked and persisted; `edge` is unlinked and gets a fresh
    /// forward action set id.
    pub(super) async fn split_conditional_group(
        &mut self,
        tree_id: &str,
        edge: &mut Edge,
    ) -> Result<()> {
        let Some(key) = edge.conditional_group() else {
            return Ok(());
        };
        let siblings: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| e.id != edge.id && e.in_group(&key))
            .cloned()
            .collect();
        info!(
            "Forward actions of conditional edge {} changed, unlinking {} sibling(s)",
            edge.id,
            siblings.len()
        );

        for mut sibling in siblings {
            sibling.unlink();
            self.store_edge(tree_id, sibling).await?;
        }

        edge.unlink();
        let new_id = format!("actionset-{}", Uuid::new_v4().simple());
        if edge.data.default_action_set_id == key.action_set_id {
            edge.data.default_action_set_id = new_id.clone();
        }
        if let Some(forward) = edge.action_set_mut(EdgeDirection::Forward) {
            forward.id = new_id;
        }
        Ok(())
    }
}
