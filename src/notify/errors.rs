//! Notification error types

use thiserror::Error;

/// Result type for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The profile collaborator failed.
    #[error("profile source failed: {0}")]
    ProfileSource(String),

    /// The delivery collaborator refused or failed a request.
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error("invalid reminder schedule '{pattern}': {reason}")]
    InvalidSchedule { pattern: String, reason: String },

    #[error("invalid notify configuration: {0}")]
    Config(String),
}
