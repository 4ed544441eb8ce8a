//! Navgraph editor core.
//!
//! Headless state for editing device navigation trees: the host API client, the
//! device registry, the path preview cache and the graph state core, wired together
//! by [`NavigationEditorProvider`].

#![warn(clippy::all, rust_2018_idioms)]

pub mod api;
pub mod clock;
pub mod error;
pub mod exploration;
pub mod navigation;
pub mod preview_cache;
pub mod provider;
pub mod registry;
mod settings;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, ApiResult, HostApi, TreeContent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::NavigationError;
pub use exploration::{ExplorationRunner, ExplorationSummary, RunOutcome};
pub use navigation::{NavigationContext, SaveStatus};
pub use preview_cache::PreviewCache;
pub use provider::NavigationEditorProvider;
pub use registry::DeviceRegistry;
pub use settings::EditorSettings;
pub use state::{EditorChannels, EditorEvent};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
