//! Eligibility criteria
//!
//! A scheme's criteria are a mapping from criterion name to a typed
//! predicate over one profile attribute. Each predicate kind carries its own
//! evaluator:
//!
//! - `Range` - numeric bounds, inclusive on both ends, either end optional
//! - `OneOf` - set membership, case-insensitive
//! - `Flag` - boolean equality
//!
//! Mandatory criteria gate eligibility. Informative criteria never exclude a
//! scheme; they only contribute to ranking and explanation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::profile::{format_number, Attribute, AttributeKind, AttributeValue, Profile};

/// A typed predicate over one attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    OneOf {
        values: BTreeSet<String>,
    },
    Flag {
        expected: bool,
    },
}

impl Predicate {
    pub fn at_least(min: f64) -> Self {
        Predicate::Range {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Predicate::Range {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Predicate::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::OneOf {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn flag(expected: bool) -> Self {
        Predicate::Flag { expected }
    }

    /// The attribute kind this predicate can be evaluated against.
    pub fn kind(&self) -> AttributeKind {
        match self {
            Predicate::Range { .. } => AttributeKind::Numeric,
            Predicate::OneOf { .. } => AttributeKind::Categorical,
            Predicate::Flag { .. } => AttributeKind::Flag,
        }
    }

    /// Tests a value. `None` when the value's kind does not fit the predicate.
    pub fn test(&self, value: &AttributeValue) -> Option<bool> {
        match (self, value) {
            (Predicate::Range { min, max }, AttributeValue::Number(n)) => {
                let above = min.map(|m| *n >= m).unwrap_or(true);
                let below = max.map(|m| *n <= m).unwrap_or(true);
                Some(above && below)
            }
            (Predicate::OneOf { values }, AttributeValue::Text(s)) => {
                Some(values.iter().any(|v| v.trim().eq_ignore_ascii_case(s.trim())))
            }
            (Predicate::Flag { expected }, AttributeValue::Flag(b)) => Some(expected == b),
            _ => None,
        }
    }

    /// Describes the requirement, e.g. "must be at least 60".
    pub fn describe(&self) -> String {
        match self {
            Predicate::Range {
                min: Some(lo),
                max: Some(hi),
            } => format!(
                "must be between {} and {}",
                format_number(*lo),
                format_number(*hi)
            ),
            Predicate::Range {
                min: Some(lo),
                max: None,
            } => format!("must be at least {}", format_number(*lo)),
            Predicate::Range {
                min: None,
                max: Some(hi),
            } => format!("must be at most {}", format_number(*hi)),
            Predicate::Range {
                min: None,
                max: None,
            } => "may be any value".to_string(),
            Predicate::OneOf { values } => {
                let list: Vec<&str> = values.iter().map(String::as_str).collect();
                if list.len() == 1 {
                    format!("must be {}", list[0])
                } else {
                    format!("must be one of {}", list.join(", "))
                }
            }
            Predicate::Flag { expected: true } => "must be yes".to_string(),
            Predicate::Flag { expected: false } => "must be no".to_string(),
        }
    }
}

/// Whether a criterion gates eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    Mandatory,
    Informative,
}

/// Outcome of one criterion against one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionStatus {
    Met,
    Unmet,
    /// The profile does not carry the attribute. Never satisfies a criterion.
    Unknown,
}

impl CriterionStatus {
    pub fn is_met(&self) -> bool {
        matches!(self, CriterionStatus::Met)
    }
}

/// One named predicate over one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub attribute: Attribute,
    pub predicate: Predicate,
    #[serde(default)]
    pub requirement: Requirement,
}

impl Criterion {
    pub fn mandatory(attribute: Attribute, predicate: Predicate) -> Self {
        Self {
            attribute,
            predicate,
            requirement: Requirement::Mandatory,
        }
    }

    pub fn informative(attribute: Attribute, predicate: Predicate) -> Self {
        Self {
            attribute,
            predicate,
            requirement: Requirement::Informative,
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.requirement == Requirement::Mandatory
    }

    pub fn evaluate(&self, profile: &Profile) -> CriterionStatus {
        match profile.attribute(self.attribute) {
            None => CriterionStatus::Unknown,
            Some(value) => match self.predicate.test(&value) {
                Some(true) => CriterionStatus::Met,
                Some(false) => CriterionStatus::Unmet,
                None => CriterionStatus::Unknown,
            },
        }
    }
}

/// Named criteria of one scheme, iterated in name order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EligibilityCriteria {
    criteria: BTreeMap<String, Criterion>,
}

impl EligibilityCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mandatory criterion named after its attribute.
    pub fn require(mut self, attribute: Attribute, predicate: Predicate) -> Self {
        self.criteria.insert(
            attribute.name().to_string(),
            Criterion::mandatory(attribute, predicate),
        );
        self
    }

    /// Adds an informative criterion named after its attribute.
    pub fn prefer(mut self, attribute: Attribute, predicate: Predicate) -> Self {
        self.criteria.insert(
            attribute.name().to_string(),
            Criterion::informative(attribute, predicate),
        );
        self
    }

    /// Inserts a criterion under an explicit name, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, criterion: Criterion) {
        self.criteria.insert(name.into(), criterion);
    }

    pub fn get(&self, name: &str) -> Option<&Criterion> {
        self.criteria.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.criteria.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn mandatory(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.iter().filter(|(_, c)| c.is_mandatory())
    }

    pub fn informative(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.iter().filter(|(_, c)| !c.is_mandatory())
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}
