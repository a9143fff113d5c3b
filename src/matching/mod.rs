//! Eligibility matching
//!
//! - `MatchingEngine` - ranked eligible schemes for one profile
//! - `explain_eligibility` - criterion-by-criterion account of one scheme
//! - `ScoringWeights` - named, configurable relevance weights
//! - `MatchCache` - results keyed by profile hash and corpus version

mod cache;
mod engine;
mod explain;
mod ranking;
mod result;
mod scoring;

pub use cache::{CacheStats, MatchCache};
pub use engine::{EvaluationContext, MatchingEngine};
pub use explain::{
    applicability_issues, assess_criteria, explain_eligibility, CriterionOutcome,
    EligibilityExplanation,
};
pub use ranking::{compare_matches, rank};
pub use result::{Evaluation, MalformedRecordWarning, SchemeMatch};
pub use scoring::{ScoreInputs, ScoringWeights};
