//! Editor events and the channel that carries them to the UI layer.

use navgraph_types::{NodeId, TreeId};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Messages sent from the editor core to whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A tree was loaded and is now displayed
    TreeLoaded { tree_id: TreeId, name: String },
    /// The displayed tree changed through the parent chain
    TreeSwitched { tree_id: TreeId, depth: usize },
    /// The device's believed position changed
    PositionChanged {
        tree_id: TreeId,
        node_id: NodeId,
        node_label: String,
        /// Node ids from the root to the current node, inclusive
        breadcrumb: Vec<NodeId>,
    },
    /// A save completed
    Saved { message: String },
    /// A user-facing operation failed
    OperationFailed { message: String },
}

/// Event channel pair.
pub struct EditorChannels {
    /// Sender for editor events (cloned into each producer)
    pub tx: Sender<EditorEvent>,
    /// Receiver for editor events (owned by the UI)
    pub rx: Receiver<EditorEvent>,
}

impl EditorChannels {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    /// Get a clone of the sender.
    pub fn sender(&self) -> Sender<EditorEvent> {
        self.tx.clone()
    }
}

impl Default for EditorChannels {
    fn default() -> Self {
        Self::new()
    }
}
