//! Prior eligibility per user
//!
//! A user is re-evaluated for a changed scheme only when the ledger already
//! knows the user's standing for that scheme or its category. Seeding from
//! the profile collaborator evaluates a user against the whole corpus and
//! marks every category as known.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UserStanding {
    eligible: BTreeSet<String>,
    known_schemes: BTreeSet<String>,
    known_categories: BTreeSet<String>,
    /// Evaluated against a whole snapshot.
    full: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EligibilityLedger {
    users: BTreeMap<String, UserStanding>,
}

fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

impl EligibilityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a user's standing with a full evaluation result.
    pub fn seed<'a, I>(&mut self, user_id: &str, eligible: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let eligible: BTreeSet<String> = eligible.into_iter().map(str::to_string).collect();
        self.users.insert(
            user_id.to_string(),
            UserStanding {
                known_schemes: eligible.clone(),
                eligible,
                known_categories: BTreeSet::new(),
                full: true,
            },
        );
    }

    /// Records one scheme's outcome for one user.
    pub fn record(&mut self, user_id: &str, scheme_id: &str, category: &str, eligible: bool) {
        let standing = self.users.entry(user_id.to_string()).or_default();
        standing.known_schemes.insert(scheme_id.to_string());
        standing.known_categories.insert(category_key(category));
        if eligible {
            standing.eligible.insert(scheme_id.to_string());
        } else {
            standing.eligible.remove(scheme_id);
        }
    }

    pub fn is_eligible(&self, user_id: &str, scheme_id: &str) -> bool {
        self.users
            .get(user_id)
            .map(|s| s.eligible.contains(scheme_id))
            .unwrap_or(false)
    }

    /// Users whose standing for this scheme or category is known, in id order.
    pub fn users_knowing(&self, scheme_id: &str, category: &str) -> Vec<String> {
        let category = category_key(category);
        self.users
            .iter()
            .filter(|(_, s)| {
                s.full
                    || s.known_schemes.contains(scheme_id)
                    || s.known_categories.contains(&category)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drops a scheme from every user's standing.
    pub fn forget_scheme(&mut self, scheme_id: &str) {
        for standing in self.users.values_mut() {
            standing.eligible.remove(scheme_id);
            standing.known_schemes.remove(scheme_id);
        }
    }

    pub fn forget_user(&mut self, user_id: &str) {
        self.users.remove(user_id);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
