//! Sync error types

use thiserror::Error;

use crate::corpus::CorpusError;

/// Failures reported by a remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Connection reset, 5xx, or similar. Retried.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// A fetch exceeded its deadline. Retried.
    #[error("remote fetch timed out after {0} ms")]
    Timeout(u64),

    /// The authority does not know the requested record.
    #[error("record '{0}' not found on remote")]
    NotFound(String),

    /// The authority answered with something unusable.
    #[error("remote protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Transient(_) | RemoteError::Timeout(_))
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A fetched record's hash disagrees with its manifest entry.
    #[error("integrity check failed for '{scheme_id}': manifest {expected}, payload {actual}")]
    Integrity {
        scheme_id: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The corpus refused the assembled delta.
    #[error("corpus rejected sync delta: {0}")]
    Rejected(#[from] CorpusError),

    #[error("sync checkpoint {context}: {reason}")]
    Checkpoint { context: String, reason: String },
}

impl SyncError {
    pub fn checkpoint(context: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Checkpoint {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}
