//! Navigation trees and the persisted (wire) form of nodes and edges.
//!
//! The editor works on [`Node`]/[`Edge`]; the host stores flatter records with
//! a free-form `data` bag for secondary attributes. Conversions live here so
//! both sides agree on the mapping.

use crate::edge::{ActionSet, Edge, EdgeData, EdgeId, EdgeKind, EdgeStyle};
use crate::node::{Node, NodeData, NodeId, NodeType, Position, TreeId, Verification};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata of a navigation tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeInfo {
    pub id: TreeId,
    pub name: String,
    #[serde(default)]
    pub is_root_tree: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tree_id: Option<TreeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<NodeId>,
}

/// Canvas pan/zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Persisted representation of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub label: String,
    pub node_type: NodeType,
    pub position_x: f64,
    pub position_y: f64,
    #[serde(default)]
    pub verifications: Vec<Verification>,
    /// Secondary attributes (description, depth, parent, priority, ...)
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Persisted representation of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub edge_id: EdgeId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub action_sets: Vec<ActionSet>,
    #[serde(default)]
    pub default_action_set_id: String,
    #[serde(default)]
    pub final_wait_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
    #[serde(default)]
    pub is_conditional: bool,
    #[serde(default)]
    pub is_conditional_primary: bool,
    /// Visual attributes (handles)
    #[serde(default)]
    pub data: Map<String, Value>,
}

const KEY_DESCRIPTION: &str = "description";
const KEY_SCREENSHOT: &str = "screenshot";
const KEY_DEPTH: &str = "depth";
const KEY_PARENT: &str = "parent";
const KEY_PRIORITY: &str = "priority";
const KEY_IS_ROOT: &str = "is_root";
const KEY_CHILD_TREE: &str = "child_tree_id";
const KEY_SOURCE_HANDLE: &str = "sourceHandle";
const KEY_TARGET_HANDLE: &str = "targetHandle";

fn take_string(bag: &mut Map<String, Value>, key: &str) -> Option<String> {
    match bag.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        let d = &node.data;
        let mut data = d.extra.clone();
        data.insert(KEY_DESCRIPTION.into(), Value::String(d.description.clone()));
        if let Some(ref screenshot) = d.screenshot {
            data.insert(KEY_SCREENSHOT.into(), Value::String(screenshot.clone()));
        }
        data.insert(KEY_DEPTH.into(), Value::from(d.depth));
        data.insert(
            KEY_PARENT.into(),
            Value::Array(d.parent.iter().cloned().map(Value::String).collect()),
        );
        if let Some(ref priority) = d.priority {
            data.insert(KEY_PRIORITY.into(), Value::String(priority.clone()));
        }
        data.insert(KEY_IS_ROOT.into(), Value::Bool(d.is_root));
        if let Some(ref child) = d.child_tree_id {
            data.insert(KEY_CHILD_TREE.into(), Value::String(child.clone()));
        }

        Self {
            node_id: node.id.clone(),
            label: d.label.clone(),
            node_type: node.node_type.clone(),
            position_x: node.position.x,
            position_y: node.position.y,
            verifications: d.verifications.clone(),
            data,
        }
    }
}

impl NodeRecord {
    /// Convert back into an editor node. Parent-reference flags are view-only
    /// and never come back from the host.
    pub fn into_node(self) -> Node {
        let mut bag = self.data;
        let description = take_string(&mut bag, KEY_DESCRIPTION).unwrap_or_default();
        let screenshot = take_string(&mut bag, KEY_SCREENSHOT);
        let depth = bag
            .remove(KEY_DEPTH)
            .and_then(|v| v.as_u64())
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(0);
        let parent = match bag.remove(KEY_PARENT) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        let priority = take_string(&mut bag, KEY_PRIORITY);
        let is_root = bag
            .remove(KEY_IS_ROOT)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let child_tree_id = take_string(&mut bag, KEY_CHILD_TREE);

        Node {
            id: self.node_id,
            node_type: self.node_type,
            position: Position::new(self.position_x, self.position_y),
            data: NodeData {
                label: self.label,
                description,
                screenshot,
                depth,
                parent,
                verifications: self.verifications,
                priority,
                is_root,
                is_parent_reference: false,
                original_tree_id: None,
                child_tree_id,
                extra: bag,
            },
        }
    }
}

impl From<&Edge> for EdgeRecord {
    fn from(edge: &Edge) -> Self {
        let mut data = Map::new();
        if let Some(ref handle) = edge.source_handle {
            data.insert(KEY_SOURCE_HANDLE.into(), Value::String(handle.clone()));
        }
        if let Some(ref handle) = edge.target_handle {
            data.insert(KEY_TARGET_HANDLE.into(), Value::String(handle.clone()));
        }

        let d = &edge.data;
        Self {
            edge_id: edge.id.clone(),
            source_node_id: edge.source.clone(),
            target_node_id: edge.target.clone(),
            label: d.label.clone(),
            action_sets: d.action_sets.clone(),
            default_action_set_id: d.default_action_set_id.clone(),
            final_wait_time: d.final_wait_time,
            priority: d.priority.clone(),
            threshold: d.threshold,
            is_conditional: d.is_conditional,
            is_conditional_primary: d.is_conditional_primary,
            data,
        }
    }
}

impl EdgeRecord {
    /// Convert back into an editor edge, restoring style from the source handle.
    pub fn into_edge(self) -> Edge {
        let mut bag = self.data;
        let source_handle = take_string(&mut bag, KEY_SOURCE_HANDLE);
        let target_handle = take_string(&mut bag, KEY_TARGET_HANDLE);
        let kind = EdgeKind::from_handle(source_handle.as_deref());

        Edge {
            id: self.edge_id,
            source: self.source_node_id,
            target: self.target_node_id,
            source_handle,
            target_handle,
            edge_type: Some(kind.edge_type().to_string()),
            style: Some(EdgeStyle {
                stroke: kind.color().to_string(),
                stroke_width: 2.0,
            }),
            data: EdgeData {
                label: self.label,
                action_sets: self.action_sets,
                default_action_set_id: self.default_action_set_id,
                final_wait_time: self.final_wait_time,
                priority: self.priority,
                threshold: self.threshold,
                is_conditional: self.is_conditional,
                is_conditional_primary: self.is_conditional_primary,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Action;

    #[test]
    fn test_node_record_keeps_secondary_attributes() {
        let mut node = Node::new("live", NodeType::Screen, "Live TV", Position::new(10.0, 20.0));
        node.data.description = "Fullscreen player".to_string();
        node.data.depth = 2;
        node.data.parent = vec!["home".to_string()];
        node.data.priority = Some("p1".to_string());
        node.data
            .extra
            .insert("menu_type".to_string(), Value::String("vertical".to_string()));

        let record = NodeRecord::from(&node);
        assert_eq!(record.position_x, 10.0);
        assert_eq!(record.data.get("depth"), Some(&Value::from(2)));

        assert_eq!(record.into_node(), node);
    }

    #[test]
    fn test_out_of_range_depth_falls_back_to_zero() {
        let json = serde_json::json!({
            "node_id": "deep",
            "label": "Deep",
            "node_type": "screen",
            "position_x": 0.0,
            "position_y": 0.0,
            "data": {"depth": u64::from(u32::MAX) + 1}
        });
        let record: NodeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.into_node().data.depth, 0);
    }

    #[test]
    fn test_node_record_drops_parent_reference_flags() {
        let mut node = Node::new("home", NodeType::Screen, "Home", Position::default());
        node.data.is_parent_reference = true;
        node.data.original_tree_id = Some("root".to_string());

        let back = NodeRecord::from(&node).into_node();
        assert!(!back.data.is_parent_reference);
        assert!(back.data.original_tree_id.is_none());
    }

    #[test]
    fn test_edge_record_restores_handles_and_style() {
        let json = serde_json::json!({
            "edge_id": "e1",
            "source_node_id": "home",
            "target_node_id": "live",
            "action_sets": [{
                "id": "home_to_live",
                "actions": [{"command": "press_key", "params": {"key": "OK"}}]
            }],
            "default_action_set_id": "home_to_live",
            "data": {"sourceHandle": "failure", "targetHandle": "top-target"}
        });
        let record: EdgeRecord = serde_json::from_value(json).unwrap();
        let edge = record.into_edge();

        assert_eq!(edge.source_handle.as_deref(), Some("failure"));
        assert_eq!(edge.target_handle.as_deref(), Some("top-target"));
        assert_eq!(edge.style.as_ref().unwrap().stroke, "#ef4444");
        assert_eq!(
            edge.forward_action_set().unwrap().actions[0],
            Action::new("press_key").with_param("key", "OK")
        );
    }
}
