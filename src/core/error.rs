use super::types::ItemId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionError {
    /// Caller broke an API contract (e.g. paging forward with no token).
    /// These indicate a bug in the surrounding UI, not a runtime condition.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No action bound for kind '{0}'")]
    UnknownAction(String),

    /// Selected ids whose items were never loaded in the current filter
    /// session, so there is nothing to hand to a bulk action.
    #[error("{} selected item(s) are not loaded: {}", .0.len(), join_ids(.0))]
    UnloadedSelection(Vec<ItemId>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, CollectionError>;

impl CollectionError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter().map(ItemId::as_str).collect::<Vec<_>>().join(", ")
}

/// Failure reported by a list endpoint.
///
/// Fetch failures are transient: the query keeps its last good page and
/// exposes this value as a retryable error flag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetch failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
pub struct FetchError {
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Structured failure returned by a mutation endpoint (HTTP-style status + message).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct MutationFailure {
    pub status: u16,
    pub message: String,
}

impl MutationFailure {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A mutation future that panicked instead of resolving.
    pub(crate) fn panicked() -> Self {
        Self::new(500, "mutation aborted unexpectedly")
    }
}
