//! Deterministic match ordering
//!
//! 1. `relevance_score` descending
//! 2. level: central, state, district
//! 3. deadline ascending, schemes without a deadline last
//! 4. scheme id ascending
//!
//! The last key is unique within a snapshot, so the order is total.

use std::cmp::Ordering;

use super::result::SchemeMatch;

pub fn compare_matches(a: &SchemeMatch, b: &SchemeMatch) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| a.level.rank().cmp(&b.level.rank()))
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.scheme_id.cmp(&b.scheme_id))
}

/// Sorts matches into ranked order.
pub fn rank(matches: &mut [SchemeMatch]) {
    matches.sort_by(compare_matches);
}
