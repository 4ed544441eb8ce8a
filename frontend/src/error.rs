//! Error taxonomy of the editor core.

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors surfaced by editor operations.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// Caller supplied invalid input; raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// Operation referenced a node/edge that is not in the current state.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl NavigationError {
    pub(crate) fn node_not_found(id: impl Into<String>) -> Self {
        NavigationError::NotFound {
            kind: "Node",
            id: id.into(),
        }
    }

    pub(crate) fn edge_not_found(id: impl Into<String>) -> Self {
        NavigationError::NotFound {
            kind: "Edge",
            id: id.into(),
        }
    }
}

impl From<garde::Report> for NavigationError {
    fn from(report: garde::Report) -> Self {
        NavigationError::Validation(report.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavigationError>;
