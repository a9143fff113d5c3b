//! Profile attributes addressable by eligibility criteria
//!
//! Criteria never reach into a profile directly. They name an `Attribute`,
//! and the profile answers with an `AttributeValue` (or nothing when the
//! attribute is unknown for that individual).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of value an attribute carries.
///
/// A predicate is only meaningful against attributes of a compatible kind:
/// ranges against numeric attributes, set membership against categorical
/// ones, flags against boolean ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    Categorical,
    Flag,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Numeric => write!(f, "numeric"),
            AttributeKind::Categorical => write!(f, "categorical"),
            AttributeKind::Flag => write!(f, "flag"),
        }
    }
}

/// A profile attribute that a criterion can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    Age,
    Gender,
    IncomeLevel,
    Occupation,
    State,
    District,
    CasteCategory,
    HasDisability,
    FamilySize,
    HasLandOwnership,
    LandArea,
}

impl Attribute {
    /// Every attribute, in declaration order.
    pub const ALL: [Attribute; 11] = [
        Attribute::Age,
        Attribute::Gender,
        Attribute::IncomeLevel,
        Attribute::Occupation,
        Attribute::State,
        Attribute::District,
        Attribute::CasteCategory,
        Attribute::HasDisability,
        Attribute::FamilySize,
        Attribute::HasLandOwnership,
        Attribute::LandArea,
    ];

    /// Wire name, identical to the serde representation.
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Age => "age",
            Attribute::Gender => "gender",
            Attribute::IncomeLevel => "incomeLevel",
            Attribute::Occupation => "occupation",
            Attribute::State => "state",
            Attribute::District => "district",
            Attribute::CasteCategory => "casteCategory",
            Attribute::HasDisability => "hasDisability",
            Attribute::FamilySize => "familySize",
            Attribute::HasLandOwnership => "hasLandOwnership",
            Attribute::LandArea => "landArea",
        }
    }

    /// Human-readable label used in eligibility suggestions.
    pub fn label(&self) -> &'static str {
        match self {
            Attribute::Age => "age",
            Attribute::Gender => "gender",
            Attribute::IncomeLevel => "income level",
            Attribute::Occupation => "occupation",
            Attribute::State => "state",
            Attribute::District => "district",
            Attribute::CasteCategory => "caste category",
            Attribute::HasDisability => "disability status",
            Attribute::FamilySize => "family size",
            Attribute::HasLandOwnership => "land ownership",
            Attribute::LandArea => "land area",
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            Attribute::Age | Attribute::FamilySize | Attribute::LandArea => AttributeKind::Numeric,
            Attribute::HasDisability | Attribute::HasLandOwnership => AttributeKind::Flag,
            Attribute::Gender
            | Attribute::IncomeLevel
            | Attribute::Occupation
            | Attribute::State
            | Attribute::District
            | Attribute::CasteCategory => AttributeKind::Categorical,
        }
    }

    /// Parses a wire name back into an attribute.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete attribute value read from a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Number(_) => AttributeKind::Numeric,
            AttributeValue::Text(_) => AttributeKind::Categorical,
            AttributeValue::Flag(_) => AttributeKind::Flag,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Number(n) => write!(f, "{}", format_number(*n)),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Flag(true) => f.write_str("yes"),
            AttributeValue::Flag(false) => f.write_str("no"),
        }
    }
}

/// Formats a number without a trailing `.0` for whole values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
