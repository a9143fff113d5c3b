//! Scheme validator
//!
//! Validation rules:
//! - id and category are non-empty
//! - state/district level schemes name a state; central schemes do not
//! - every criterion name is non-empty
//! - predicate kind matches the attribute kind
//! - range predicates carry at least one finite bound and min <= max
//! - set predicates are non-empty and contain no blank values
//!
//! Validation is deterministic, does not mutate the scheme, and stops at the
//! first violation.

use crate::profile::format_number;

use super::criteria::{Criterion, Predicate};
use super::errors::{SchemeError, SchemeErrorCode, SchemeResult, ValidationDetails};
use super::types::{Scheme, SchemeLevel};

/// Stateless validator for scheme records.
pub struct SchemeValidator;

impl SchemeValidator {
    /// Validates one scheme record.
    ///
    /// # Errors
    ///
    /// Returns `SchemeError` naming the first offending field.
    pub fn validate(scheme: &Scheme) -> SchemeResult<()> {
        let id = scheme.id();
        if id.trim().is_empty() {
            return Err(SchemeError::invalid_field(
                id,
                ValidationDetails::missing_field("id"),
            ));
        }

        if scheme.category().trim().is_empty() {
            return Err(SchemeError::invalid_field(
                id,
                ValidationDetails::missing_field("category"),
            ));
        }

        match (scheme.level(), scheme.state()) {
            (SchemeLevel::Central, Some(state)) => {
                return Err(SchemeError::invalid_field(
                    id,
                    ValidationDetails::new("state", "absent for central schemes", state),
                ));
            }
            (SchemeLevel::State | SchemeLevel::District, None) => {
                return Err(SchemeError::invalid_field(
                    id,
                    ValidationDetails::missing_field("state"),
                ));
            }
            (SchemeLevel::State | SchemeLevel::District, Some(state))
                if state.trim().is_empty() =>
            {
                return Err(SchemeError::invalid_field(
                    id,
                    ValidationDetails::missing_field("state"),
                ));
            }
            _ => {}
        }

        for (name, criterion) in scheme.criteria().iter() {
            Self::validate_criterion(id, name, criterion)?;
        }

        Ok(())
    }

    fn validate_criterion(scheme_id: &str, name: &str, criterion: &Criterion) -> SchemeResult<()> {
        if name.trim().is_empty() {
            return Err(SchemeError::invalid_field(
                scheme_id,
                ValidationDetails::missing_field("criteria.<name>"),
            ));
        }

        let field = format!("criteria.{}", name);
        let attribute_kind = criterion.attribute.kind();
        if criterion.predicate.kind() != attribute_kind {
            return Err(SchemeError::new(
                SchemeErrorCode::KindMismatch,
                scheme_id,
                ValidationDetails::new(
                    field,
                    format!("{} predicate for '{}'", attribute_kind, criterion.attribute),
                    format!("{} predicate", criterion.predicate.kind()),
                ),
            ));
        }

        match &criterion.predicate {
            Predicate::Range { min, max } => {
                if min.is_none() && max.is_none() {
                    return Err(SchemeError::new(
                        SchemeErrorCode::InvalidRange,
                        scheme_id,
                        ValidationDetails::new(field, "at least one bound", "no bounds"),
                    ));
                }
                for (suffix, bound) in [("min", min), ("max", max)] {
                    if let Some(b) = bound {
                        if !b.is_finite() {
                            return Err(SchemeError::new(
                                SchemeErrorCode::InvalidRange,
                                scheme_id,
                                ValidationDetails::new(
                                    format!("{}.{}", field, suffix),
                                    "finite number",
                                    b.to_string(),
                                ),
                            ));
                        }
                    }
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(SchemeError::new(
                            SchemeErrorCode::InvalidRange,
                            scheme_id,
                            ValidationDetails::new(
                                field,
                                "min <= max",
                                format!("min {} > max {}", format_number(*lo), format_number(*hi)),
                            ),
                        ));
                    }
                }
            }
            Predicate::OneOf { values } => {
                if values.is_empty() {
                    return Err(SchemeError::new(
                        SchemeErrorCode::EmptySet,
                        scheme_id,
                        ValidationDetails::new(field, "at least one value", "empty set"),
                    ));
                }
                if values.iter().any(|v| v.trim().is_empty()) {
                    return Err(SchemeError::new(
                        SchemeErrorCode::EmptySet,
                        scheme_id,
                        ValidationDetails::new(field, "non-blank values", "blank value"),
                    ));
                }
            }
            Predicate::Flag { .. } => {}
        }

        Ok(())
    }
}
