//! Linear undo/redo history of graph snapshots.

use navgraph_types::{Edge, Node};

/// Nodes and edges at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Insert or replace a node by id.
    pub fn upsert_node(&mut self, node: Node) {
        match self.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
    }

    /// Insert or replace an edge by id.
    pub fn upsert_edge(&mut self, edge: Edge) {
        match self.edges.iter_mut().find(|e| e.id == edge.id) {
            Some(existing) => *existing = edge,
            None => self.edges.push(edge),
        }
    }
}

/// Snapshots with a cursor. Entry 0 is the state the history was reset to.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<GraphSnapshot>,
    cursor: usize,
    limit: usize,
}

impl History {
    pub fn new(initial: GraphSnapshot, limit: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Start over from a new base state.
    pub fn reset(&mut self, initial: GraphSnapshot) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
    }

    /// Record a new state, discarding anything that could have been redone.
    pub fn push(&mut self, snapshot: GraphSnapshot) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    pub fn undo(&mut self) -> Option<&GraphSnapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    pub fn redo(&mut self) -> Option<&GraphSnapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navgraph_types::{NodeType, Position};

    fn snapshot(labels: &[&str]) -> GraphSnapshot {
        GraphSnapshot::new(
            labels
                .iter()
                .map(|l| Node::new(*l, NodeType::Screen, *l, Position::default()))
                .collect(),
            Vec::new(),
        )
    }

    #[test]
    fn test_new_action_after_undo_discards_redo() {
        let mut history = History::new(snapshot(&[]), 100);
        history.push(snapshot(&["a"]));
        history.push(snapshot(&["a", "b"]));

        assert_eq!(history.undo(), Some(&snapshot(&["a"])));
        assert!(history.can_redo());

        history.push(snapshot(&["a", "c"]));
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some(&snapshot(&["a"])));
        assert_eq!(history.undo(), Some(&snapshot(&[])));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(snapshot(&[]), 3);
        history.push(snapshot(&["a"]));
        history.push(snapshot(&["b"]));
        history.push(snapshot(&["c"]));
        assert_eq!(history.len(), 3);

        assert_eq!(history.undo(), Some(&snapshot(&["b"])));
        assert_eq!(history.undo(), Some(&snapshot(&["a"])));
        assert!(!history.can_undo());
    }
}
