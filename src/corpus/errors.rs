//! Corpus error types
//!
//! Error codes:
//! - CORPUS_VALIDATION_FAILED (REJECT) - whole delta rejected, version unchanged
//! - CORPUS_VERSION_UNAVAILABLE (REJECT) - requested version not retained
//! - CORPUS_PERSISTENCE_FAILED (ERROR) - change log or record table write failed
//! - CORPUS_LOG_CORRUPTION (FATAL) - change log failed its checksum on open
//! - CORPUS_INTERNAL (ERROR) - lock poisoning

use std::fmt;

use crate::changelog::ChangeLogError;
use crate::scheme::{SchemeError, ValidationDetails};

/// Severity levels for corpus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected, corpus unchanged
    Reject,
    /// Operation failed, corpus still serving
    Error,
    /// Corpus cannot be opened
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Corpus-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusErrorCode {
    ValidationFailed,
    VersionUnavailable,
    PersistenceFailed,
    LogCorruption,
    Internal,
}

impl CorpusErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            CorpusErrorCode::ValidationFailed => "CORPUS_VALIDATION_FAILED",
            CorpusErrorCode::VersionUnavailable => "CORPUS_VERSION_UNAVAILABLE",
            CorpusErrorCode::PersistenceFailed => "CORPUS_PERSISTENCE_FAILED",
            CorpusErrorCode::LogCorruption => "CORPUS_LOG_CORRUPTION",
            CorpusErrorCode::Internal => "CORPUS_INTERNAL",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CorpusErrorCode::ValidationFailed | CorpusErrorCode::VersionUnavailable => {
                Severity::Reject
            }
            CorpusErrorCode::PersistenceFailed | CorpusErrorCode::Internal => Severity::Error,
            CorpusErrorCode::LogCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for CorpusErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Corpus error with full context
#[derive(Debug)]
pub struct CorpusError {
    code: CorpusErrorCode,
    message: String,
    /// Offending scheme id for validation failures
    scheme_id: Option<String>,
    /// Offending field for validation failures
    details: Option<ValidationDetails>,
    source: Option<ChangeLogError>,
}

impl CorpusError {
    fn new(code: CorpusErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            scheme_id: None,
            details: None,
            source: None,
        }
    }

    /// A delta was rejected because one of its records is malformed.
    pub fn validation(err: SchemeError) -> Self {
        Self {
            code: CorpusErrorCode::ValidationFailed,
            message: format!("Delta rejected: {}", err),
            scheme_id: Some(err.scheme_id().to_string()),
            details: Some(err.details().clone()),
            source: None,
        }
    }

    /// A delta names the same scheme id in more than one operation.
    pub fn duplicate_id(scheme_id: impl Into<String>, position: usize) -> Self {
        let id = scheme_id.into();
        Self {
            code: CorpusErrorCode::ValidationFailed,
            message: format!("Delta rejected: scheme '{}' appears more than once", id),
            scheme_id: Some(id.clone()),
            details: Some(ValidationDetails::new(
                format!("ops[{}].schemeId", position),
                "unique id within the delta",
                format!("duplicate '{}'", id),
            )),
            source: None,
        }
    }

    pub fn version_unavailable(requested: u64, oldest: u64, current: u64) -> Self {
        Self::new(
            CorpusErrorCode::VersionUnavailable,
            format!(
                "Version {} is not retained (retained range {}..={})",
                requested, oldest, current
            ),
        )
    }

    pub fn persistence(context: impl Into<String>, source: ChangeLogError) -> Self {
        let context = context.into();
        Self {
            code: CorpusErrorCode::PersistenceFailed,
            message: format!("{}: {}", context, source),
            scheme_id: None,
            details: None,
            source: Some(source),
        }
    }

    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::new(CorpusErrorCode::LogCorruption, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CorpusErrorCode::Internal, message)
    }

    pub fn code(&self) -> CorpusErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn scheme_id(&self) -> Option<&str> {
        self.scheme_id.as_deref()
    }

    /// Name of the offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.field.as_str())
    }

    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }

    pub fn is_validation(&self) -> bool {
        self.code == CorpusErrorCode::ValidationFailed
    }
}

impl fmt::Display for CorpusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for CorpusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for corpus operations
pub type CorpusResult<T> = Result<T, CorpusError>;

/// A writer observed a version other than the one it built on.
///
/// Resolved inside the corpus by rebuilding on the newer version; never
/// returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConflictError {
    pub expected: u64,
    pub found: u64,
}
