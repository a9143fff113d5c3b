//! Scheme record types
//!
//! A `Scheme` pairs an immutable id with mutable `SchemeContent`. The
//! content hash is derived, never supplied: every construction path
//! (including deserialization) recomputes it from the content.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::criteria::EligibilityCriteria;
use super::hash::ContentHash;

/// Administrative level a scheme is run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeLevel {
    Central,
    State,
    District,
}

impl SchemeLevel {
    /// Tie-break rank: central before state before district.
    pub fn rank(&self) -> u8 {
        match self {
            SchemeLevel::Central => 0,
            SchemeLevel::State => 1,
            SchemeLevel::District => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeLevel::Central => "central",
            SchemeLevel::State => "state",
            SchemeLevel::District => "district",
        }
    }
}

impl fmt::Display for SchemeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every mutable field of a scheme. The content hash covers exactly this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeContent {
    #[serde(default)]
    pub name: String,
    pub category: String,
    pub level: SchemeLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub criteria: EligibilityCriteria,
    #[serde(default)]
    pub benefits: String,
    #[serde(default)]
    pub application_process: String,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SchemeContent {
    /// Minimal content: everything but category and level left empty.
    pub fn new(category: impl Into<String>, level: SchemeLevel) -> Self {
        Self {
            name: String::new(),
            category: category.into(),
            level,
            state: None,
            criteria: EligibilityCriteria::new(),
            benefits: String::new(),
            application_process: String::new(),
            documents: Vec::new(),
            contact: String::new(),
            deadline: None,
            is_active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_criteria(mut self, criteria: EligibilityCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_benefits(mut self, benefits: impl Into<String>) -> Self {
        self.benefits = benefits.into();
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}

/// One benefit program and its eligibility rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SchemeWire", into = "SchemeWire")]
pub struct Scheme {
    id: String,
    content: SchemeContent,
    content_hash: ContentHash,
}

impl Scheme {
    pub fn new(id: impl Into<String>, content: SchemeContent) -> Self {
        let content_hash = ContentHash::of(&content);
        Self {
            id: id.into(),
            content,
            content_hash,
        }
    }

    /// Replaces the content, recomputing the hash. The id never changes.
    pub fn with_content(self, content: SchemeContent) -> Self {
        Self::new(self.id, content)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &SchemeContent {
        &self.content
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    pub fn category(&self) -> &str {
        &self.content.category
    }

    pub fn level(&self) -> SchemeLevel {
        self.content.level
    }

    pub fn state(&self) -> Option<&str> {
        self.content.state.as_deref()
    }

    pub fn criteria(&self) -> &EligibilityCriteria {
        &self.content.criteria
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        self.content.deadline
    }

    pub fn is_active(&self) -> bool {
        self.content.is_active
    }

    /// Whether the deadline (if any) is still open on `as_of`.
    pub fn is_open_on(&self, as_of: NaiveDate) -> bool {
        self.content.deadline.map(|d| d >= as_of).unwrap_or(true)
    }
}

/// Serialized shape: id, flattened content, and the derived hash.
///
/// Incoming hashes are ignored; the hash is always recomputed.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemeWire {
    id: String,
    #[serde(flatten)]
    content: SchemeContent,
    #[serde(default, skip_deserializing)]
    content_hash: Option<ContentHash>,
}

impl From<SchemeWire> for Scheme {
    fn from(wire: SchemeWire) -> Self {
        Scheme::new(wire.id, wire.content)
    }
}

impl From<Scheme> for SchemeWire {
    fn from(scheme: Scheme) -> Self {
        SchemeWire {
            id: scheme.id,
            content: scheme.content,
            content_hash: Some(scheme.content_hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Attribute;
    use crate::scheme::Predicate;

    fn pension() -> SchemeContent {
        SchemeContent::new("pension", SchemeLevel::Central)
            .with_name("Old Age Pension")
            .with_criteria(
                EligibilityCriteria::new().require(Attribute::Age, Predicate::at_least(60.0)),
            )
    }

    #[test]
    fn test_hash_recomputed_on_write() {
        let scheme = Scheme::new("S1", pension());
        let before = scheme.content_hash();
        let updated = scheme.with_content(pension().with_benefits("Rs 500/month"));
        assert_ne!(before, updated.content_hash());
        assert_eq!(updated.id(), "S1");
    }

    #[test]
    fn test_hash_excludes_id() {
        assert_eq!(
            Scheme::new("A", pension()).content_hash(),
            Scheme::new("B", pension()).content_hash()
        );
    }

    #[test]
    fn test_deserialize_recomputes_hash() {
        let scheme = Scheme::new("S1", pension());
        let mut json = serde_json::to_value(&scheme).unwrap();
        assert_eq!(json["contentHash"], scheme.content_hash().to_hex());

        json["contentHash"] = serde_json::json!(ContentHash::of_bytes(b"forged").to_hex());
        let back: Scheme = serde_json::from_value(json).unwrap();
        assert_eq!(back, scheme);
    }

    #[test]
    fn test_level_rank() {
        assert!(SchemeLevel::Central.rank() < SchemeLevel::State.rank());
        assert!(SchemeLevel::State.rank() < SchemeLevel::District.rank());
    }

    #[test]
    fn test_open_on_deadline_day() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let scheme = Scheme::new("S1", pension().with_deadline(d));
        assert!(scheme.is_open_on(d));
        assert!(!scheme.is_open_on(d.succ_opt().unwrap()));
    }
}
