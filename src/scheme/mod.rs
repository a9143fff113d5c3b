//! Scheme rule model
//!
//! This module provides:
//! - `Scheme` / `SchemeContent` - one benefit program record
//! - `EligibilityCriteria` - named typed predicates over profile attributes
//! - `ContentHash` - digest over mutable content, recomputed on every write
//! - `SchemeValidator` - rejects malformed records, naming the offending field

mod criteria;
mod errors;
pub(crate) mod hash;
mod types;
mod validator;

pub use criteria::{Criterion, CriterionStatus, EligibilityCriteria, Predicate, Requirement};
pub use errors::{SchemeError, SchemeErrorCode, SchemeResult, ValidationDetails};
pub use hash::ContentHash;
pub use types::{Scheme, SchemeContent, SchemeLevel};
pub use validator::SchemeValidator;
