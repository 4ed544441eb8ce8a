//! Diff of the live graph against the last persisted baseline.

use super::history::GraphSnapshot;
use navgraph_types::{Edge, EdgeRecord, Node, NodeRecord, TreeSaveRequest, Viewport};
use std::collections::HashSet;

/// Fields of a node that the bulk save tracks.
pub fn node_changed(before: &Node, after: &Node) -> bool {
    before.position != after.position
        || before.data.label != after.data.label
        || before.data.description != after.data.description
        || before.node_type != after.node_type
        || before.data.screenshot != after.data.screenshot
        || before.data.verifications != after.data.verifications
}

/// Fields of an edge that the bulk save tracks.
pub fn edge_changed(before: &Edge, after: &Edge) -> bool {
    before.data.label != after.data.label
        || before.source != after.source
        || before.target != after.target
        || before.source_handle != after.source_handle
        || before.target_handle != after.target_handle
        || before.data.action_sets != after.data.action_sets
}

/// Build the bulk save payload: new or changed entities plus deletions.
///
/// Parent-reference nodes belong to another tree and are never part of the diff.
pub fn compute_tree_diff(
    baseline: &GraphSnapshot,
    nodes: &[Node],
    edges: &[Edge],
    viewport: Viewport,
) -> TreeSaveRequest {
    let owned = |n: &&Node| !n.data.is_parent_reference;

    let changed_nodes = nodes
        .iter()
        .filter(owned)
        .filter(|node| match baseline.node(&node.id) {
            Some(before) => node_changed(before, node),
            None => true,
        })
        .map(NodeRecord::from)
        .collect();

    let changed_edges = edges
        .iter()
        .filter(|edge| match baseline.edge(&edge.id) {
            Some(before) => edge_changed(before, edge),
            None => true,
        })
        .map(EdgeRecord::from)
        .collect();

    let live_nodes: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let live_edges: HashSet<&str> = edges.iter().map(|e| e.id.as_str()).collect();

    TreeSaveRequest {
        nodes: changed_nodes,
        edges: changed_edges,
        deleted_node_ids: baseline
            .nodes
            .iter()
            .filter(owned)
            .filter(|n| !live_nodes.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect(),
        deleted_edge_ids: baseline
            .edges
            .iter()
            .filter(|e| !live_edges.contains(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect(),
        viewport: Some(viewport),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navgraph_types::{NodeType, Position};

    fn node(id: &str, x: f64) -> Node {
        Node::new(id, NodeType::Screen, id, Position::new(x, 0.0))
    }

    #[test]
    fn test_only_new_and_changed_nodes_are_sent() {
        let baseline = GraphSnapshot::new(vec![node("a", 0.0), node("b", 0.0)], Vec::new());
        let live = vec![node("a", 0.0), node("b", 40.0), node("c", 0.0)];

        let diff = compute_tree_diff(&baseline, &live, &[], Viewport::default());
        let ids: Vec<&str> = diff.nodes.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(diff.deleted_node_ids.is_empty());
    }

    #[test]
    fn test_missing_baseline_nodes_are_deleted() {
        let baseline = GraphSnapshot::new(vec![node("a", 0.0), node("b", 0.0)], Vec::new());
        let live = vec![node("a", 0.0)];

        let diff = compute_tree_diff(&baseline, &live, &[], Viewport::default());
        assert!(diff.nodes.is_empty());
        assert_eq!(diff.deleted_node_ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_untracked_fields_do_not_count_as_changes() {
        let before = node("a", 0.0);
        let mut after = before.clone();
        after.data.depth = 4;
        after.data.priority = Some("p1".to_string());
        assert!(!node_changed(&before, &after));

        after.data.description = "changed".to_string();
        assert!(node_changed(&before, &after));
    }

    #[test]
    fn test_unknown_node_type_is_saved_unchanged() {
        let record: NodeRecord = serde_json::from_value(serde_json::json!({
            "node_id": "player",
            "label": "Player",
            "node_type": "playback",
            "position_x": 0.0,
            "position_y": 0.0
        }))
        .unwrap();
        let before = record.into_node();
        let baseline = GraphSnapshot::new(vec![before.clone()], Vec::new());

        let mut moved = before;
        moved.position = Position::new(80.0, 20.0);
        let diff = compute_tree_diff(&baseline, &[moved], &[], Viewport::default());

        assert_eq!(diff.nodes.len(), 1);
        assert_eq!(diff.nodes[0].node_type, NodeType::Other("playback".to_string()));
        let payload = serde_json::to_value(&diff).unwrap();
        assert_eq!(payload["nodes"][0]["node_type"], "playback");
    }

    #[test]
    fn test_parent_reference_nodes_are_ignored() {
        let mut reference = node("home", 0.0);
        reference.data.is_parent_reference = true;
        reference.data.original_tree_id = Some("root".to_string());

        let diff = compute_tree_diff(
            &GraphSnapshot::default(),
            &[reference.clone()],
            &[],
            Viewport::default(),
        );
        assert!(diff.nodes.is_empty());

        let baseline = GraphSnapshot::new(vec![reference], Vec::new());
        let diff = compute_tree_diff(&baseline, &[], &[], Viewport::default());
        assert!(diff.deleted_node_ids.is_empty());
    }
}
