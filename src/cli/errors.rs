//! CLI error types
//!
//! Every CLI error ends the process with a non-zero status after a JSON
//! error object is written to stdout.

use std::io;

use thiserror::Error;

use crate::corpus::CorpusError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Io(String),

    /// Unreadable or malformed `--delta` / `--profile` file.
    #[error("invalid input {path}: {reason}")]
    Input { path: String, reason: String },

    #[error("Data directory already initialized")]
    AlreadyInitialized,

    #[error("Data directory not initialized. Run 'yojana init' first.")]
    NotInitialized,

    #[error("scheme '{0}' not found")]
    SchemeNotFound(String),

    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

impl CliError {
    pub fn input(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Input {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable code written in the JSON error object.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "YOJANA_CLI_CONFIG_ERROR",
            Self::Io(_) => "YOJANA_CLI_IO_ERROR",
            Self::Input { .. } => "YOJANA_CLI_INVALID_INPUT",
            Self::AlreadyInitialized => "YOJANA_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "YOJANA_CLI_NOT_INITIALIZED",
            Self::SchemeNotFound(_) => "YOJANA_CLI_SCHEME_NOT_FOUND",
            Self::Corpus(e) => e.code().code(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Io(format!("JSON error: {}", e))
    }
}

pub type CliResult<T> = Result<T, CliError>;
