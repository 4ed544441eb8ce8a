//! Stack of nested tree views.

use super::history::GraphSnapshot;
use navgraph_types::{Edge, Node, TreeId};

/// One displayed tree in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLevel {
    pub tree_id: TreeId,
    pub tree_name: String,
    /// Content as last displayed, including edits not yet saved
    pub graph: GraphSnapshot,
    /// Content as last persisted; the diff base for this level
    pub baseline: GraphSnapshot,
    pub has_unsaved_changes: bool,
}

impl TreeLevel {
    /// A level whose content matches the host.
    pub fn new(
        tree_id: impl Into<TreeId>,
        tree_name: impl Into<String>,
        graph: GraphSnapshot,
    ) -> Self {
        Self {
            tree_id: tree_id.into(),
            tree_name: tree_name.into(),
            baseline: graph.clone(),
            graph,
            has_unsaved_changes: false,
        }
    }
}

/// Top of the stack is the tree currently displayed.
#[derive(Debug, Clone, Default)]
pub struct ParentChain {
    levels: Vec<TreeLevel>,
}

impl ParentChain {
    /// Replace the whole chain with a single root level.
    pub fn reset(&mut self, root: TreeLevel) {
        self.levels.clear();
        self.levels.push(root);
    }

    pub fn push(&mut self, level: TreeLevel) {
        self.levels.push(level);
    }

    /// Remove the top level and return the new top. No-op when only one level remains.
    pub fn pop(&mut self) -> Option<&TreeLevel> {
        if self.levels.len() <= 1 {
            return None;
        }
        self.levels.pop();
        self.levels.last()
    }

    /// Collapse to the first level and return it.
    pub fn reset_to_root(&mut self) -> Option<&TreeLevel> {
        self.levels.truncate(1);
        self.levels.first()
    }

    pub fn current(&self) -> Option<&TreeLevel> {
        self.levels.last()
    }

    pub fn levels(&self) -> &[TreeLevel] {
        &self.levels
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Store the live content, its baseline and the unsaved flag in the top level.
    pub fn store_current(
        &mut self,
        nodes: &[Node],
        edges: &[Edge],
        baseline: &GraphSnapshot,
        has_unsaved_changes: bool,
    ) {
        if let Some(top) = self.levels.last_mut() {
            top.graph = GraphSnapshot::new(nodes.to_vec(), edges.to_vec());
            top.baseline = baseline.clone();
            top.has_unsaved_changes = has_unsaved_changes;
        }
    }

    /// Whether any level above the root holds unsaved edits.
    pub fn has_unsaved_subtrees(&self) -> bool {
        self.levels.iter().skip(1).any(|l| l.has_unsaved_changes)
    }

    /// Refresh a persisted node in every level of the given tree.
    pub fn update_node(&mut self, tree_id: &str, node: &Node) {
        for level in self.levels.iter_mut().filter(|l| l.tree_id == tree_id) {
            level.graph.upsert_node(node.clone());
            level.baseline.upsert_node(node.clone());
        }
    }

    /// Refresh a persisted edge in every level of the given tree.
    pub fn update_edge(&mut self, tree_id: &str, edge: &Edge) {
        for level in self.levels.iter_mut().filter(|l| l.tree_id == tree_id) {
            level.graph.upsert_edge(edge.clone());
            level.baseline.upsert_edge(edge.clone());
        }
    }
}
