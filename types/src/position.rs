//! Last known device positions within navigation trees.

use crate::node::{NodeId, TreeId};
use serde::{Deserialize, Serialize};

/// Where a physical device is currently believed to be in a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicePosition {
    pub node_id: NodeId,
    pub node_label: String,
    pub tree_id: TreeId,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Registry key for a device position: one entry per (host, device, tree).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DevicePositionKey {
    pub host_name: String,
    pub device_id: String,
    pub tree_id: TreeId,
}

impl DevicePositionKey {
    pub fn new(
        host_name: impl Into<String>,
        device_id: impl Into<String>,
        tree_id: impl Into<TreeId>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            device_id: device_id.into(),
            tree_id: tree_id.into(),
        }
    }
}

impl std::fmt::Display for DevicePositionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.host_name, self.device_id, self.tree_id)
    }
}
