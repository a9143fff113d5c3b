//! Per-criterion eligibility explanation
//!
//! Suggestions are built only from the failing predicate's boundary and the
//! profile's actual value, e.g. "income level must be BPL; yours is APL".

use chrono::NaiveDate;
use serde::Serialize;

use crate::profile::{Attribute, Profile};
use crate::scheme::{CriterionStatus, Requirement, Scheme};

/// Result of one criterion for one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionOutcome {
    pub name: String,
    pub attribute: Attribute,
    pub requirement: Requirement,
    pub status: CriterionStatus,
    /// What the predicate asks for, e.g. "must be at least 60".
    pub expected: String,
    /// The profile's value, if it has one.
    pub actual: Option<String>,
}

impl CriterionOutcome {
    pub fn is_met(&self) -> bool {
        self.status.is_met()
    }

    pub fn is_mandatory(&self) -> bool {
        self.requirement == Requirement::Mandatory
    }

    fn suggestion(&self) -> String {
        match &self.actual {
            Some(actual) => format!(
                "{} {}; yours is {}",
                self.attribute.label(),
                self.expected,
                actual
            ),
            None => format!("{} {}; not provided", self.attribute.label(), self.expected),
        }
    }
}

/// Why a scheme does or does not apply to a profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityExplanation {
    pub scheme_id: String,
    pub eligible: bool,
    /// Reasons the scheme is closed to this profile regardless of criteria.
    pub applicability: Vec<String>,
    pub criteria: Vec<CriterionOutcome>,
    pub matched: Vec<String>,
    /// Mandatory criteria that are not met.
    pub failed: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Evaluates every criterion of `scheme`, in name order.
pub fn assess_criteria(profile: &Profile, scheme: &Scheme) -> Vec<CriterionOutcome> {
    scheme
        .criteria()
        .iter()
        .map(|(name, criterion)| CriterionOutcome {
            name: name.to_string(),
            attribute: criterion.attribute,
            requirement: criterion.requirement,
            status: criterion.evaluate(profile),
            expected: criterion.predicate.describe(),
            actual: profile.attribute(criterion.attribute).map(|v| v.to_string()),
        })
        .collect()
}

/// Reasons a scheme is closed to a profile on `as_of`, independent of its
/// criteria: inactive, past its deadline, or restricted to another state.
pub fn applicability_issues(profile: &Profile, scheme: &Scheme, as_of: NaiveDate) -> Vec<String> {
    let mut issues = Vec::new();
    if !scheme.is_active() {
        issues.push("scheme is not active".to_string());
    }
    if !scheme.is_open_on(as_of) {
        if let Some(deadline) = scheme.deadline() {
            issues.push(format!("deadline {} has passed", deadline));
        }
    }
    if let Some(state) = scheme.state() {
        if !state.trim().eq_ignore_ascii_case(profile.state.trim()) {
            issues.push(format!(
                "only available in {}; yours is {}",
                state,
                display_or_missing(&profile.state)
            ));
        }
    }
    issues
}

fn display_or_missing(value: &str) -> &str {
    if value.trim().is_empty() {
        "not provided"
    } else {
        value
    }
}

/// Explains one scheme for one profile.
pub fn explain_eligibility(
    profile: &Profile,
    scheme: &Scheme,
    as_of: NaiveDate,
) -> EligibilityExplanation {
    let applicability = applicability_issues(profile, scheme, as_of);
    let criteria = assess_criteria(profile, scheme);

    let matched = criteria
        .iter()
        .filter(|c| c.is_met())
        .map(|c| c.name.clone())
        .collect();
    let failing: Vec<&CriterionOutcome> = criteria
        .iter()
        .filter(|c| c.is_mandatory() && !c.is_met())
        .collect();
    let failed = failing.iter().map(|c| c.name.clone()).collect();
    let suggestions = failing.iter().map(|c| c.suggestion()).collect();
    let eligible = applicability.is_empty() && failing.is_empty();

    EligibilityExplanation {
        scheme_id: scheme.id().to_string(),
        eligible,
        applicability,
        criteria,
        matched,
        failed,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{EligibilityCriteria, Predicate, SchemeContent, SchemeLevel};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn pension() -> Scheme {
        Scheme::new(
            "OLD_AGE",
            SchemeContent::new("pension", SchemeLevel::Central).with_criteria(
                EligibilityCriteria::new()
                    .require(Attribute::Age, Predicate::at_least(60.0))
                    .require(Attribute::IncomeLevel, Predicate::one_of(["BPL"]))
                    .require(Attribute::CasteCategory, Predicate::one_of(["SC", "ST"]))
                    .prefer(Attribute::HasLandOwnership, Predicate::flag(false)),
            ),
        )
    }

    #[test]
    fn test_suggestions_from_boundaries() {
        let profile = Profile::new("u1", 45, "Odisha").with_income_level("APL");
        let explanation = explain_eligibility(&profile, &pension(), today());
        assert!(!explanation.eligible);
        assert_eq!(explanation.failed, vec!["age", "casteCategory", "incomeLevel"]);
        assert_eq!(
            explanation.suggestions,
            vec![
                "age must be at least 60; yours is 45",
                "caste category must be one of SC, ST; not provided",
                "income level must be BPL; yours is APL",
            ]
        );
    }

    #[test]
    fn test_informative_never_fails() {
        let profile = Profile::new("u1", 70, "Odisha")
            .with_income_level("BPL")
            .with_caste_category("SC")
            .with_land(Some(2.0));
        let explanation = explain_eligibility(&profile, &pension(), today());
        assert!(explanation.eligible);
        assert!(explanation.failed.is_empty());
        assert!(!explanation.matched.contains(&"hasLandOwnership".to_string()));
    }

    #[test]
    fn test_state_restriction() {
        let scheme = Scheme::new(
            "KA_HOUSING",
            SchemeContent::new("housing", SchemeLevel::State).with_state("Karnataka"),
        );
        let profile = Profile::new("u1", 30, "Odisha");
        let explanation = explain_eligibility(&profile, &scheme, today());
        assert!(!explanation.eligible);
        assert_eq!(
            explanation.applicability,
            vec!["only available in Karnataka; yours is Odisha"]
        );
    }

    #[test]
    fn test_expired_and_inactive() {
        let scheme = Scheme::new(
            "OLD",
            SchemeContent::new("pension", SchemeLevel::Central)
                .with_deadline(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
                .with_active(false),
        );
        let explanation = explain_eligibility(&Profile::new("u1", 30, "Odisha"), &scheme, today());
        assert_eq!(explanation.applicability.len(), 2);
        assert!(explanation.applicability[1].contains("2024-06-30"));
    }
}
