//! Scheme validation error types
//!
//! Error codes:
//! - SCHEME_INVALID_FIELD (REJECT)
//! - SCHEME_INVALID_RANGE (REJECT)
//! - SCHEME_EMPTY_SET (REJECT)
//! - SCHEME_KIND_MISMATCH (REJECT)
//!
//! Every error names the offending field. Malformed records are rejected,
//! never coerced.

use std::fmt;

/// Scheme-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeErrorCode {
    /// Required field missing or malformed
    InvalidField,
    /// Range predicate with min > max, no bounds, or non-finite bounds
    InvalidRange,
    /// Set-membership predicate with no values
    EmptySet,
    /// Predicate kind does not fit the attribute kind
    KindMismatch,
}

impl SchemeErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemeErrorCode::InvalidField => "SCHEME_INVALID_FIELD",
            SchemeErrorCode::InvalidRange => "SCHEME_INVALID_RANGE",
            SchemeErrorCode::EmptySet => "SCHEME_EMPTY_SET",
            SchemeErrorCode::KindMismatch => "SCHEME_KIND_MISMATCH",
        }
    }
}

impl fmt::Display for SchemeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g., "criteria.age.min")
    pub field: String,
    /// Expected condition
    pub expected: String,
    /// What was found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "non-empty value", "missing")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Scheme validation error with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeError {
    code: SchemeErrorCode,
    scheme_id: String,
    details: ValidationDetails,
}

impl SchemeError {
    pub fn new(
        code: SchemeErrorCode,
        scheme_id: impl Into<String>,
        details: ValidationDetails,
    ) -> Self {
        Self {
            code,
            scheme_id: scheme_id.into(),
            details,
        }
    }

    pub fn invalid_field(scheme_id: impl Into<String>, details: ValidationDetails) -> Self {
        Self::new(SchemeErrorCode::InvalidField, scheme_id, details)
    }

    pub fn code(&self) -> SchemeErrorCode {
        self.code
    }

    pub fn scheme_id(&self) -> &str {
        &self.scheme_id
    }

    /// Path of the offending field.
    pub fn field(&self) -> &str {
        &self.details.field
    }

    pub fn details(&self) -> &ValidationDetails {
        &self.details
    }
}

impl fmt::Display for SchemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: scheme '{}' {}",
            self.code.code(),
            self.scheme_id,
            self.details
        )
    }
}

impl std::error::Error for SchemeError {}

/// Result type for scheme validation
pub type SchemeResult<T> = Result<T, SchemeError>;
