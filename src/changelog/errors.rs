//! Change log error types

use std::io;

use thiserror::Error;

/// Result type for change log operations
pub type ChangeLogResult<T> = Result<T, ChangeLogError>;

/// Change log and record table errors
#[derive(Debug, Error)]
pub enum ChangeLogError {
    /// Write, fsync, or rename failed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A frame failed its checksum or structure check
    #[error("change log corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// Versions in the log are not contiguous
    #[error("non-sequential change log version: expected {expected}, found {found}")]
    NonSequential { expected: u64, found: u64 },

    /// Payload or table could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChangeLogError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ChangeLogError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        ChangeLogError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// True for errors that mean the log on disk cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ChangeLogError::Corruption { .. } | ChangeLogError::NonSequential { .. }
        )
    }
}
