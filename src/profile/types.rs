//! Profile snapshot passed into matching
//!
//! Profiles are owned by an external collaborator. The engine only ever
//! sees immutable copies and never writes back.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::attribute::{Attribute, AttributeValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unspecified => "unspecified",
        }
    }
}

/// Normalized attribute set describing one individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Identity of the user this profile belongs to. Not part of the profile hash.
    pub user_id: String,
    pub age: u32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub income_level: String,
    #[serde(default)]
    pub occupation: String,
    pub state: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub caste_category: Option<String>,
    #[serde(default)]
    pub has_disability: bool,
    #[serde(default = "default_family_size")]
    pub family_size: u32,
    #[serde(default)]
    pub has_land_ownership: bool,
    #[serde(default)]
    pub land_area: Option<f64>,
}

fn default_family_size() -> u32 {
    1
}

impl Profile {
    /// Creates a profile with the required attributes; everything else unknown.
    pub fn new(user_id: impl Into<String>, age: u32, state: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            age,
            gender: Gender::Unspecified,
            income_level: String::new(),
            occupation: String::new(),
            state: state.into(),
            district: String::new(),
            caste_category: None,
            has_disability: false,
            family_size: default_family_size(),
            has_land_ownership: false,
            land_area: None,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_income_level(mut self, level: impl Into<String>) -> Self {
        self.income_level = level.into();
        self
    }

    pub fn with_occupation(mut self, occupation: impl Into<String>) -> Self {
        self.occupation = occupation.into();
        self
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = district.into();
        self
    }

    pub fn with_caste_category(mut self, category: impl Into<String>) -> Self {
        self.caste_category = Some(category.into());
        self
    }

    pub fn with_disability(mut self, has_disability: bool) -> Self {
        self.has_disability = has_disability;
        self
    }

    pub fn with_family_size(mut self, size: u32) -> Self {
        self.family_size = size;
        self
    }

    pub fn with_land(mut self, area: Option<f64>) -> Self {
        self.has_land_ownership = area.map(|a| a > 0.0).unwrap_or(false);
        self.land_area = area;
        self
    }

    /// Reads one attribute. Empty text attributes count as unknown.
    pub fn attribute(&self, attribute: Attribute) -> Option<AttributeValue> {
        match attribute {
            Attribute::Age => Some(AttributeValue::Number(f64::from(self.age))),
            Attribute::Gender => match self.gender {
                Gender::Unspecified => None,
                g => Some(AttributeValue::Text(g.as_str().to_string())),
            },
            Attribute::IncomeLevel => text(&self.income_level),
            Attribute::Occupation => text(&self.occupation),
            Attribute::State => text(&self.state),
            Attribute::District => text(&self.district),
            Attribute::CasteCategory => self.caste_category.as_deref().and_then(text),
            Attribute::HasDisability => Some(AttributeValue::Flag(self.has_disability)),
            Attribute::FamilySize => Some(AttributeValue::Number(f64::from(self.family_size))),
            Attribute::HasLandOwnership => Some(AttributeValue::Flag(self.has_land_ownership)),
            Attribute::LandArea => self.land_area.map(AttributeValue::Number),
        }
    }

    /// Digest over every attribute except the user id.
    ///
    /// Two users with identical attributes share a hash, and therefore
    /// share cached match results.
    pub fn profile_hash(&self) -> ProfileHash {
        let mut hasher = Sha256::new();
        for attribute in Attribute::ALL {
            hasher.update(attribute.name().as_bytes());
            hasher.update([0x1f]);
            match self.attribute(attribute) {
                Some(AttributeValue::Number(n)) => {
                    hasher.update([b'n']);
                    hasher.update(n.to_bits().to_le_bytes());
                }
                Some(AttributeValue::Text(s)) => {
                    hasher.update([b't']);
                    hasher.update(s.as_bytes());
                }
                Some(AttributeValue::Flag(b)) => hasher.update([b'f', u8::from(b)]),
                None => hasher.update([b'-']),
            }
            hasher.update([0x1e]);
        }
        ProfileHash(hasher.finalize().into())
    }
}

fn text(value: &str) -> Option<AttributeValue> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(AttributeValue::Text(trimmed.to_string()))
    }
}

/// SHA-256 digest identifying a profile's attribute set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileHash([u8; 32]);

impl ProfileHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ProfileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ProfileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProfileHash({})", &hex::encode(self.0)[..12])
    }
}
