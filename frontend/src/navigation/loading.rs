//! Tree loading and parent-chain navigation.

use super::{GraphSnapshot, NavigationContext, TreeLevel};
use crate::error::{NavigationError, Result};
use crate::state::EditorEvent;
use navgraph_types::{EdgeRecord, Node, NodeRecord, NodeType, Viewport};
use tracing::{debug, info, warn};

/// Tree content as last fetched from the host.
#[derive(Debug, Clone)]
pub(super) struct CachedTree {
    name: String,
    graph: GraphSnapshot,
    viewport: Option<Viewport>,
}

impl NavigationContext {
    /// Load a tree and make it the root of a fresh parent chain.
    ///
    /// Seeds the active device's position to the root node unless one is already known.
    pub async fn load_tree(&mut self, tree_id: &str) -> Result<()> {
        match self.load_tree_inner(tree_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail("Load tree", e)),
        }
    }

    async fn load_tree_inner(&mut self, tree_id: &str) -> Result<()> {
        let cached = self.fetch_tree(tree_id).await?;
        info!(
            "Loaded tree {} '{}' ({} nodes, {} edges)",
            tree_id,
            cached.name,
            cached.graph.nodes.len(),
            cached.graph.edges.len()
        );

        self.tree_id = Some(tree_id.to_string());
        self.tree_name = cached.name.clone();
        self.viewport = cached.viewport.unwrap_or_default();
        self.replace_graph(cached.graph.clone());
        self.parent_chain.reset(TreeLevel::new(tree_id, cached.name.clone(), cached.graph));
        self.current_node_id = None;
        self.breadcrumb.clear();
        self.emit(EditorEvent::TreeLoaded {
            tree_id: tree_id.to_string(),
            name: cached.name,
        });

        self.seed_device_position();
        Ok(())
    }

    /// Drill into a subtree from `parent_node_id`.
    ///
    /// The parent node is shown inside the subtree as a reference to its owning tree.
    pub async fn enter_subtree(
        &mut self,
        tree_id: &str,
        tree_name: &str,
        parent_node_id: &str,
    ) -> Result<()> {
        match self.enter_subtree_inner(tree_id, tree_name, parent_node_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail("Open subtree", e)),
        }
    }

    async fn enter_subtree_inner(
        &mut self,
        tree_id: &str,
        tree_name: &str,
        parent_node_id: &str,
    ) -> Result<()> {
        let current_tree = self.require_tree()?;
        let parent = self
            .node(parent_node_id)
            .cloned()
            .ok_or_else(|| NavigationError::node_not_found(parent_node_id))?;
        let owner = parent.owning_tree(&current_tree).to_string();

        let cached = self.fetch_tree(tree_id).await?;
        let mut graph = cached.graph;
        if graph.node(&parent.id).is_none() {
            let mut reference = parent;
            reference.data.is_parent_reference = true;
            reference.data.original_tree_id = Some(owner);
            graph.nodes.insert(0, reference);
        }

        let name = if tree_name.is_empty() {
            cached.name
        } else {
            tree_name.to_string()
        };
        self.add_to_parent_chain(TreeLevel::new(tree_id, name, graph));
        Ok(())
    }

    /// Push a subtree view and display it.
    ///
    /// The current tree's edits stay in its level and come back on return.
    pub fn add_to_parent_chain(&mut self, level: TreeLevel) {
        self.stash_current_level();
        self.parent_chain.push(level.clone());
        self.show_level(level);
    }

    /// Return to the parent tree. Returns false when already at the top.
    ///
    /// Unsaved edits of the subtree being left are discarded.
    pub fn pop_from_parent_chain(&mut self) -> bool {
        if self.parent_chain.depth() <= 1 {
            return false;
        }
        if self.has_unsaved_changes {
            warn!("Discarding unsaved changes in tree {}", self.tree_label());
        }
        let Some(level) = self.parent_chain.pop().cloned() else {
            return false;
        };
        self.show_level(level);
        true
    }

    /// Return to the first tree of the chain. Returns false when already there.
    ///
    /// Unsaved edits of the intermediate subtrees are discarded.
    pub fn reset_to_root(&mut self) -> bool {
        if self.parent_chain.depth() <= 1 {
            return false;
        }
        self.stash_current_level();
        if self.parent_chain.has_unsaved_subtrees() {
            warn!("Discarding unsaved changes in nested trees");
        }
        let Some(level) = self.parent_chain.reset_to_root().cloned() else {
            return false;
        };
        self.show_level(level);
        true
    }

    fn stash_current_level(&mut self) {
        self.parent_chain.store_current(
            &self.nodes,
            &self.edges,
            &self.initial_state,
            self.has_unsaved_changes,
        );
    }

    fn tree_label(&self) -> &str {
        self.tree_id.as_deref().unwrap_or("<none>")
    }

    fn show_level(&mut self, level: TreeLevel) {
        info!("Showing tree {} (depth {})", level.tree_id, self.parent_chain.depth());
        self.tree_id = Some(level.tree_id.clone());
        self.tree_name = level.tree_name;
        self.replace_graph(level.graph);
        self.initial_state = level.baseline;
        self.has_unsaved_changes = level.has_unsaved_changes;
        self.emit(EditorEvent::TreeSwitched {
            tree_id: level.tree_id,
            depth: self.parent_chain.depth(),
        });
    }

    async fn fetch_tree(&mut self, tree_id: &str) -> Result<CachedTree> {
        if let Some(cached) = self.tree_cache.get(tree_id) {
            debug!("Tree cache hit for {}", tree_id);
            return Ok(cached.clone());
        }

        let content = self.api.get_tree(tree_id).await?;
        let cached = CachedTree {
            name: content.tree.name,
            graph: GraphSnapshot::new(
                content.nodes.into_iter().map(NodeRecord::into_node).collect(),
                content.edges.into_iter().map(EdgeRecord::into_edge).collect(),
            ),
            viewport: content.viewport,
        };
        self.tree_cache.insert(tree_id.to_string(), cached.clone());
        Ok(cached)
    }

    /// The node navigation starts from: the flagged root, else the entry node, else the first.
    pub fn root_node(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.is_root())
            .or_else(|| self.nodes.iter().find(|n| n.node_type == NodeType::Entry))
            .or_else(|| self.nodes.first())
    }

    fn seed_device_position(&mut self) {
        let (Some(tree_id), Some(root)) = (self.tree_id.clone(), self.root_node().cloned()) else {
            return;
        };
        let Some((host, device)) = self.registry.active_device() else {
            debug!("No device under control, not seeding a position");
            return;
        };

        let position =
            self.registry
                .initialize_device_position(&host, &device, &tree_id, &root.id, root.label());
        let node_id = if self.node(&position.node_id).is_some() {
            position.node_id
        } else {
            root.id
        };
        self.on_position_changed(&node_id);
    }
}

#[cfg(test)]
mod tests {
    use crate::navigation::test_support::Harness;
    use crate::state::EditorEvent;
    use crate::navigation::Connection;
    use navgraph_types::{Node, NodeRecord, NodeType, Position};

    #[tokio::test]
    async fn test_load_tree_resets_state() {
        let h = Harness::with_tree(&["a", "b"]).await;

        assert_eq!(h.nav.tree_id(), Some("tree"));
        assert_eq!(h.nav.nodes().len(), 3);
        assert_eq!(h.nav.initial_state().nodes.len(), 3);
        assert!(!h.nav.can_undo());
        assert!(!h.nav.has_unsaved_changes());
        assert_eq!(h.nav.parent_chain().depth(), 1);
        assert!(h.events().contains(&EditorEvent::TreeLoaded {
            tree_id: "tree".to_string(),
            name: "Main".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_load_tree_seeds_device_position() {
        let mut h = Harness::new();
        let mut root = Node::new("home", NodeType::Screen, "Home", Position::default());
        root.data.is_root = true;
        h.api.insert_tree("tree", "Main", vec![NodeRecord::from(&root)], Vec::new());
        h.control_device();

        h.nav.load_tree("tree").await.unwrap();

        let position = h.registry.get_device_position("host-1", "device1", "tree").unwrap();
        assert_eq!(position.node_id, "home");
        assert_eq!(h.nav.current_node_id(), Some("home"));
    }

    #[tokio::test]
    async fn test_load_tree_keeps_known_device_position() {
        let mut h = Harness::new();
        let mut root = Node::new("home", NodeType::Screen, "Home", Position::default());
        root.data.is_root = true;
        let live = Node::new("live", NodeType::Screen, "Live", Position::default());
        h.api.insert_tree(
            "tree",
            "Main",
            vec![NodeRecord::from(&root), NodeRecord::from(&live)],
            Vec::new(),
        );
        h.control_device();
        h.registry.set_device_position("host-1", "device1", "tree", "live", "Live");

        h.nav.load_tree("tree").await.unwrap();
        assert_eq!(h.nav.current_node_id(), Some("live"));
    }

    #[tokio::test]
    async fn test_load_unknown_tree_fails() {
        let mut h = Harness::new();
        assert!(h.nav.load_tree("missing").await.is_err());
        assert!(h.nav.error_message().is_some());
        assert!(h.nav.tree_id().is_none());
    }

    #[tokio::test]
    async fn test_subtree_round_trip() {
        let mut h = Harness::with_tree(&["a"]).await;
        let child = Node::new("detail", NodeType::Screen, "Detail", Position::default());
        h.api
            .insert_tree("sub", "Sub", vec![NodeRecord::from(&child)], Vec::new());

        h.nav.enter_subtree("sub", "", "a").await.unwrap();
        assert_eq!(h.nav.tree_id(), Some("sub"));
        assert_eq!(h.nav.tree_name(), "Sub");
        assert_eq!(h.nav.parent_chain().depth(), 2);

        let reference = h.nav.node("a").unwrap();
        assert!(reference.data.is_parent_reference);
        assert_eq!(reference.data.original_tree_id.as_deref(), Some("tree"));
        assert!(h.nav.node("detail").is_some());

        assert!(h.nav.pop_from_parent_chain());
        assert_eq!(h.nav.tree_id(), Some("tree"));
        assert!(h.nav.node("detail").is_none());
        assert!(!h.nav.pop_from_parent_chain());
    }

    #[tokio::test]
    async fn test_unsaved_edits_survive_subtree_round_trip() {
        let mut h = Harness::with_tree(&["a", "b"]).await;
        h.api.insert_tree("sub", "Sub", Vec::new(), Vec::new());
        h.nav.connect(Connection::new("start", "a")).unwrap();
        assert!(h.nav.has_unsaved_changes());

        h.nav.enter_subtree("sub", "Sub", "b").await.unwrap();
        assert!(!h.nav.has_unsaved_changes());
        assert!(h.nav.edges().is_empty());

        assert!(h.nav.pop_from_parent_chain());
        assert_eq!(h.nav.tree_id(), Some("tree"));
        assert_eq!(h.nav.edges().len(), 1);
        assert!(h.nav.has_unsaved_changes());
        assert!(h.nav.initial_state().edges.is_empty());

        let sent = h.nav.save_tree().await.unwrap();
        assert_eq!(sent.edges.len(), 1);
        assert_eq!(sent.edges[0].source_node_id, "start");
        assert_eq!(sent.edges[0].target_node_id, "a");
    }

    #[tokio::test]
    async fn test_reset_to_root_keeps_root_edits() {
        let mut h = Harness::with_tree(&["a"]).await;
        h.api.insert_tree("sub", "Sub", Vec::new(), Vec::new());
        h.nav.connect(Connection::new("start", "a")).unwrap();

        h.nav.enter_subtree("sub", "Sub", "a").await.unwrap();
        assert!(h.nav.reset_to_root());

        assert_eq!(h.nav.edges().len(), 1);
        assert!(h.nav.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_reset_to_root_from_nested_subtrees() {
        let mut h = Harness::with_tree(&["a"]).await;
        h.api.insert_tree("sub", "Sub", Vec::new(), Vec::new());
        h.api.insert_tree("subsub", "SubSub", Vec::new(), Vec::new());

        h.nav.enter_subtree("sub", "Sub", "a").await.unwrap();
        h.nav.enter_subtree("subsub", "SubSub", "a").await.unwrap();
        assert_eq!(h.nav.parent_chain().depth(), 3);
        // Still owned by the root tree, not by the intermediate subtree
        assert_eq!(h.nav.node("a").unwrap().data.original_tree_id.as_deref(), Some("tree"));

        assert!(h.nav.reset_to_root());
        assert_eq!(h.nav.parent_chain().depth(), 1);
        assert_eq!(h.nav.tree_id(), Some("tree"));
        assert!(!h.nav.reset_to_root());
    }
}
