//! Match results

use chrono::NaiveDate;
use serde::Serialize;

use crate::corpus::CorpusVersion;
use crate::scheme::SchemeLevel;

/// One scheme's result for one profile.
///
/// Derived from (profile, corpus version, evaluation date) and never
/// persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeMatch {
    pub scheme_id: String,
    pub eligible: bool,
    pub relevance_score: f64,
    /// Criteria the profile satisfies, by name.
    pub matched_criteria: Vec<String>,
    /// Criteria the profile does not satisfy or cannot be checked against.
    /// For eligible matches only informative criteria appear here.
    pub missing_criteria: Vec<String>,
    pub level: SchemeLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

/// A record left out of an evaluation because it cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedRecordWarning {
    pub scheme_id: String,
    pub reason: String,
}

/// Ranked eligible matches plus the records that were skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub version: CorpusVersion,
    pub as_of: NaiveDate,
    pub matches: Vec<SchemeMatch>,
    pub skipped: Vec<MalformedRecordWarning>,
}

impl Evaluation {
    pub fn scheme_ids(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.scheme_id.as_str()).collect()
    }

    pub fn contains(&self, scheme_id: &str) -> bool {
        self.matches.iter().any(|m| m.scheme_id == scheme_id)
    }
}
