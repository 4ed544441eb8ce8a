//! Shared types for the navgraph navigation editor.
//!
//! This crate contains the navigation graph domain model and the JSON bodies
//! exchanged with a host's REST API.

/// Default port of a host API server.
pub const DEFAULT_HOST_PORT: u16 = 5109;

pub mod api;
pub mod edge;
pub mod forms;
pub mod host;
pub mod node;
pub mod position;
pub mod tree;

// Re-export commonly used types
pub use api::{HostResponse, NavigationStep, TreeSaveRequest};
pub use edge::{
    Action, ActionSet, ConditionalGroupKey, Edge, EdgeData, EdgeDirection, EdgeId, EdgeKind,
    EdgeStyle,
};
pub use forms::{EdgeForm, NodeForm};
pub use host::{Device, Host};
pub use node::{Node, NodeData, NodeId, NodeType, Position, TreeId, Verification};
pub use position::{DevicePosition, DevicePositionKey};
pub use tree::{EdgeRecord, NodeRecord, TreeInfo, Viewport};
