// Error taxonomy for the sync core.
//
// Store calls fail softly with `StoreError`. The controller folds those into
// `SyncError`, which is only ever returned to callers that asked for a
// result (open, list, versions); background saves and polls log instead.

use canvas_common::types::DocumentId;
use thiserror::Error;

/// Failure talking to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Connection refused, reset, DNS failure, and similar.
    #[error("document store unreachable: {0}")]
    Transport(String),
    /// Any non-2xx status other than 404.
    #[error("document store returned HTTP {status}")]
    Status { status: u16 },
    #[error("document `{0}` not found")]
    NotFound(DocumentId),
    /// The body was not the JSON envelope we expected.
    #[error("malformed document store response: {0}")]
    Malformed(String),
    /// The envelope decoded but carried `success: false`.
    #[error("document store rejected request: {0}")]
    Rejected(String),
    #[error("invalid document store URL: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors surfaced by the sync controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The store could not be reached or answered with garbage.
    #[error("network failure: {0}")]
    NetworkFailure(StoreError),
    /// A save completed after a newer remote version had been adopted.
    #[error("save of `{0}` was superseded by a newer remote version")]
    StaleWrite(DocumentId),
    /// The document no longer exists on the store.
    #[error("document `{0}` not found")]
    NotFound(DocumentId),
    /// The request named a document that is not the open one.
    #[error("document `{0}` is not open")]
    NotOpen(DocumentId),
    /// The controller task has exited.
    #[error("sync controller has stopped")]
    ControllerStopped,
}

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::NetworkFailure(other),
        }
    }
}
