//! Match result cache
//!
//! - Keyed by (profile hash, corpus version, evaluation date, category)
//! - Entries are immutable once inserted
//! - Observing a newer corpus version discards every older entry
//! - Bounded; the oldest insertion is evicted first

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;

use super::engine::{EvaluationContext, MatchingEngine};
use super::result::Evaluation;
use crate::corpus::{CorpusSnapshot, CorpusVersion};
use crate::profile::{Profile, ProfileHash};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    profile: ProfileHash,
    version: CorpusVersion,
    as_of: NaiveDate,
    category: Option<String>,
}

/// Passive counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    latest: CorpusVersion,
    entries: HashMap<CacheKey, Arc<Evaluation>>,
    order: VecDeque<CacheKey>,
    stats: CacheStats,
}

#[derive(Debug)]
pub struct MatchCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl MatchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the cached evaluation or computes and stores it.
    pub fn get_or_evaluate(
        &self,
        engine: &MatchingEngine,
        profile: &Profile,
        snapshot: &CorpusSnapshot,
        ctx: &EvaluationContext,
    ) -> Arc<Evaluation> {
        let key = CacheKey {
            profile: profile.profile_hash(),
            version: snapshot.version(),
            as_of: ctx.as_of,
            category: ctx.category.clone(),
        };

        {
            let mut state = self.lock();
            if let Some(hit) = state.entries.get(&key).cloned() {
                state.stats.hits += 1;
                return hit;
            }
            state.stats.misses += 1;
        }

        // Evaluated outside the lock; a concurrent miss computes the same value.
        let evaluation = Arc::new(engine.evaluate_with(profile, snapshot, ctx));
        self.insert(key, Arc::clone(&evaluation));
        evaluation
    }

    fn insert(&self, key: CacheKey, evaluation: Arc<Evaluation>) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.lock();
        if key.version < state.latest {
            return;
        }
        if key.version > state.latest {
            let dropped = state.entries.len() as u64;
            state.entries.clear();
            state.order.clear();
            state.stats.evictions += dropped;
            state.latest = key.version;
        }
        if state.entries.contains_key(&key) {
            return;
        }
        while state.entries.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            state.stats.evictions += 1;
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, evaluation);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
