//! Collaborator error types.
//!
//! The engine itself has no fatal errors: absence is modeled as `None` and
//! transient collaborator failures are logged and absorbed, relying on the
//! next recomputation pass to retry anything still wanted. These types exist
//! so collaborators can report *why* an operation failed.

use thiserror::Error;

/// Failure reported by the backing store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Failure reported by the media fetch collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("media not found")]
    NotFound,
    #[error("fetch interrupted: {0}")]
    Interrupted(String),
    #[error("fetch failed: {0}")]
    Failed(String),
}
