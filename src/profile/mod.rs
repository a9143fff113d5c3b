//! Profile domain types
//!
//! - `Profile` - immutable attribute snapshot of one individual
//! - `Attribute` / `AttributeValue` - the addressable attribute vocabulary
//! - `ProfileHash` - cache key over attributes (user id excluded)

mod attribute;
mod types;

pub use attribute::{format_number, Attribute, AttributeKind, AttributeValue};
pub use types::{Gender, Profile, ProfileHash};
