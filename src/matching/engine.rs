//! Matching engine
//!
//! - Pure: no I/O, no shared mutable state, no clock reads beyond the
//!   evaluation date taken from the context
//! - Deterministic: identical (profile, snapshot version, as_of, category)
//!   always yields the identical ordered result
//! - A scheme is returned iff it applies on `as_of` (active, deadline open,
//!   state matches) and every mandatory criterion is met
//! - Quarantined records are skipped and reported, never fatal
//!
//! The snapshot's state index narrows candidates first. Applicability is
//! re-checked on every candidate, so the index never decides the result.

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use super::explain::{applicability_issues, assess_criteria, CriterionOutcome};
use super::ranking::rank;
use super::result::{Evaluation, MalformedRecordWarning, SchemeMatch};
use super::scoring::{ScoreInputs, ScoringWeights};
use crate::corpus::CorpusSnapshot;
use crate::observability::Event;
use crate::profile::Profile;
use crate::scheme::Scheme;

/// Inputs to an evaluation other than the profile and snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvaluationContext {
    /// Date used for deadline checks and freshness.
    pub as_of: NaiveDate,
    /// Restricts results to one category (case-insensitive).
    pub category: Option<String>,
}

impl EvaluationContext {
    pub fn on(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            category: None,
        }
    }

    /// Today's UTC date.
    pub fn today() -> Self {
        Self::on(Utc::now().date_naive())
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    fn admits_category(&self, scheme: &Scheme) -> bool {
        self.category
            .as_deref()
            .map(|c| c.trim().eq_ignore_ascii_case(scheme.category().trim()))
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    weights: ScoringWeights,
}

impl MatchingEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Ranked eligible matches as of today.
    pub fn evaluate(&self, profile: &Profile, snapshot: &CorpusSnapshot) -> Vec<SchemeMatch> {
        self.evaluate_with(profile, snapshot, &EvaluationContext::today())
            .matches
    }

    /// Ranked eligible matches plus the records skipped as malformed.
    pub fn evaluate_with(
        &self,
        profile: &Profile,
        snapshot: &CorpusSnapshot,
        ctx: &EvaluationContext,
    ) -> Evaluation {
        let mut matches = Vec::new();
        let mut skipped = Vec::new();

        for id in snapshot.candidate_ids(&profile.state) {
            let Some(scheme) = snapshot.get(id) else {
                continue;
            };
            if !ctx.admits_category(scheme) {
                continue;
            }
            if let Some(reason) = snapshot.quarantine_reason(id) {
                warn!(
                    event = Event::RecordSkipped.as_str(),
                    scheme_id = id,
                    version = snapshot.version().value(),
                    reason,
                    "malformed scheme record skipped"
                );
                skipped.push(MalformedRecordWarning {
                    scheme_id: id.to_string(),
                    reason: reason.to_string(),
                });
                continue;
            }

            let result = self.evaluate_scheme(profile, scheme, ctx.as_of);
            if result.eligible {
                matches.push(result);
            }
        }

        rank(&mut matches);
        debug!(
            event = Event::EvaluationComplete.as_str(),
            user_id = %profile.user_id,
            version = snapshot.version().value(),
            matches = matches.len(),
            skipped = skipped.len(),
            "profile evaluated"
        );

        Evaluation {
            version: snapshot.version(),
            as_of: ctx.as_of,
            matches,
            skipped,
        }
    }

    /// Evaluates one scheme regardless of whether it is eligible.
    ///
    /// Ineligible results score 0 and list every unmet criterion in
    /// `missing_criteria`.
    pub fn evaluate_scheme(
        &self,
        profile: &Profile,
        scheme: &Scheme,
        as_of: NaiveDate,
    ) -> SchemeMatch {
        let outcomes = assess_criteria(profile, scheme);
        let applicable = applicability_issues(profile, scheme, as_of).is_empty();
        let eligible = applicable
            && outcomes
                .iter()
                .filter(|o| o.is_mandatory())
                .all(CriterionOutcome::is_met);

        let matched_criteria = names(&outcomes, |o| o.is_met());
        let missing_criteria = if eligible {
            names(&outcomes, |o| !o.is_mandatory() && !o.is_met())
        } else {
            names(&outcomes, |o| !o.is_met())
        };

        let relevance_score = if eligible {
            let met = |mandatory: bool| {
                outcomes
                    .iter()
                    .filter(|o| o.is_mandatory() == mandatory && o.is_met())
                    .count()
            };
            self.weights.score(&ScoreInputs {
                mandatory_met: met(true),
                informative_met: met(false),
                level: scheme.level(),
                deadline: scheme.deadline(),
                as_of,
            })
        } else {
            0.0
        };

        SchemeMatch {
            scheme_id: scheme.id().to_string(),
            eligible,
            relevance_score,
            matched_criteria,
            missing_criteria,
            level: scheme.level(),
            deadline: scheme.deadline(),
        }
    }
}

fn names(outcomes: &[CriterionOutcome], keep: impl Fn(&CriterionOutcome) -> bool) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| keep(o))
        .map(|o| o.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusVersion;
    use crate::profile::Attribute;
    use crate::scheme::{EligibilityCriteria, Predicate, SchemeContent, SchemeLevel};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn senior() -> Scheme {
        Scheme::new(
            "SENIOR",
            SchemeContent::new("pension", SchemeLevel::Central).with_criteria(
                EligibilityCriteria::new()
                    .require(Attribute::Age, Predicate::at_least(60.0))
                    .require(Attribute::IncomeLevel, Predicate::one_of(["BPL"])),
            ),
        )
    }

    fn disability() -> Scheme {
        Scheme::new(
            "DISABILITY",
            SchemeContent::new("welfare", SchemeLevel::Central).with_criteria(
                EligibilityCriteria::new().require(Attribute::HasDisability, Predicate::flag(true)),
            ),
        )
    }

    fn profile() -> Profile {
        Profile::new("u1", 65, "Odisha").with_income_level("BPL")
    }

    #[test]
    fn test_eligible_scheme_lists_matched_criteria() {
        let snap = CorpusSnapshot::from_schemes(CorpusVersion::new(1), vec![senior()]);
        let ctx = EvaluationContext::on(date(2025, 1, 1));
        let eval = MatchingEngine::default().evaluate_with(&profile(), &snap, &ctx);
        assert_eq!(eval.scheme_ids(), vec!["SENIOR"]);
        assert_eq!(eval.matches[0].matched_criteria, vec!["age", "incomeLevel"]);
        assert!(eval.matches[0].missing_criteria.is_empty());
    }

    #[test]
    fn test_unmet_flag_excluded_and_reported() {
        let engine = MatchingEngine::default();
        let snap = CorpusSnapshot::from_schemes(CorpusVersion::new(1), vec![disability()]);
        let ctx = EvaluationContext::on(date(2025, 1, 1));
        assert!(engine.evaluate_with(&profile(), &snap, &ctx).matches.is_empty());

        let result = engine.evaluate_scheme(&profile(), &disability(), ctx.as_of);
        assert!(!result.eligible);
        assert_eq!(result.missing_criteria, vec!["hasDisability"]);
        assert_eq!(result.relevance_score, 0.0);
    }

    #[test]
    fn test_category_filter() {
        let snap = CorpusSnapshot::from_schemes(
            CorpusVersion::new(1),
            vec![senior(), disability()],
        );
        let p = profile().with_disability(true);
        let ctx = EvaluationContext::on(date(2025, 1, 1)).with_category("Welfare");
        let eval = MatchingEngine::default().evaluate_with(&p, &snap, &ctx);
        assert_eq!(eval.scheme_ids(), vec!["DISABILITY"]);
    }

    #[test]
    fn test_quarantined_record_skipped() {
        let bad = Scheme::new(
            "BAD",
            SchemeContent::new("pension", SchemeLevel::Central).with_criteria(
                EligibilityCriteria::new().require(Attribute::Age, Predicate::between(50.0, 30.0)),
            ),
        );
        let snap = CorpusSnapshot::from_schemes(CorpusVersion::new(1), vec![bad, senior()]);
        let ctx = EvaluationContext::on(date(2025, 1, 1));
        let eval = MatchingEngine::default().evaluate_with(&profile(), &snap, &ctx);
        assert_eq!(eval.scheme_ids(), vec!["SENIOR"]);
        assert_eq!(eval.skipped.len(), 1);
        assert_eq!(eval.skipped[0].scheme_id, "BAD");
    }

    #[test]
    fn test_expired_scheme_excluded() {
        let closed = Scheme::new(
            "CLOSED",
            SchemeContent::new("pension", SchemeLevel::Central).with_deadline(date(2024, 12, 31)),
        );
        let snap = CorpusSnapshot::from_schemes(CorpusVersion::new(1), vec![closed]);
        let engine = MatchingEngine::default();
        let p = profile();
        let after = EvaluationContext::on(date(2025, 1, 1));
        let on_deadline = EvaluationContext::on(date(2024, 12, 31));
        assert!(engine.evaluate_with(&p, &snap, &after).matches.is_empty());
        assert_eq!(engine.evaluate_with(&p, &snap, &on_deadline).matches.len(), 1);
    }
}
