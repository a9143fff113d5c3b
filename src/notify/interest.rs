//! User interest flags
//!
//! Interest gates lost-eligibility, withdrawal and reminder notifications.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct InterestRegistry {
    /// scheme id -> interested user ids
    by_scheme: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl InterestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, user_id: &str, scheme_id: &str) {
        self.by_scheme
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(scheme_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    pub fn withdraw(&self, user_id: &str, scheme_id: &str) {
        let mut by_scheme = self.by_scheme.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(users) = by_scheme.get_mut(scheme_id) {
            users.remove(user_id);
            if users.is_empty() {
                by_scheme.remove(scheme_id);
            }
        }
    }

    pub fn is_interested(&self, user_id: &str, scheme_id: &str) -> bool {
        self.by_scheme
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scheme_id)
            .map(|users| users.contains(user_id))
            .unwrap_or(false)
    }

    /// Interested users in id order.
    pub fn users_for(&self, scheme_id: &str) -> Vec<String> {
        self.by_scheme
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scheme_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes and returns every user interested in `scheme_id`.
    pub fn take_scheme(&self, scheme_id: &str) -> Vec<String> {
        self.by_scheme
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scheme_id)
            .map(|users| users.into_iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_withdraw() {
        let registry = InterestRegistry::new();
        registry.record("u2", "S1");
        registry.record("u1", "S1");
        assert_eq!(registry.users_for("S1"), vec!["u1", "u2"]);
        registry.withdraw("u1", "S1");
        assert!(!registry.is_interested("u1", "S1"));
        assert_eq!(registry.take_scheme("S1"), vec!["u2"]);
        assert!(registry.users_for("S1").is_empty());
    }
}
