//! CorpusSnapshot - immutable point-in-time view of the corpus
//!
//! - Tagged with exactly one version
//! - Never mutated once issued; a new version is a new snapshot
//! - Records are shared across snapshots by `Arc`, so producing the next
//!   version only copies pointers
//!
//! Each snapshot carries a pre-filter index (nationwide schemes plus schemes
//! keyed by state) and a quarantine list of records that failed validation
//! or whose stored hash disagrees with their content. Quarantined records
//! stay visible to sync and diffing but are skipped by matching.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::delta::DeltaOp;
use super::version::CorpusVersion;
use crate::scheme::{ContentHash, Scheme, SchemeValidator};

/// Immutable mapping from scheme id to scheme, tagged with a version.
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    version: CorpusVersion,
    schemes: BTreeMap<String, Arc<Scheme>>,
    index: PrefilterIndex,
    quarantined: BTreeMap<String, String>,
}

/// Cheap indexed lookup used before full predicate evaluation.
#[derive(Debug, Clone, Default)]
struct PrefilterIndex {
    /// Schemes that apply regardless of the profile's state.
    nationwide: BTreeSet<String>,
    /// Lowercased state name to scheme ids restricted to that state.
    by_state: BTreeMap<String, BTreeSet<String>>,
}

impl PrefilterIndex {
    fn build(schemes: &BTreeMap<String, Arc<Scheme>>) -> Self {
        let mut index = PrefilterIndex::default();
        for (id, scheme) in schemes {
            match scheme.state() {
                None => {
                    index.nationwide.insert(id.clone());
                }
                Some(state) => {
                    index
                        .by_state
                        .entry(normalize_state(state))
                        .or_default()
                        .insert(id.clone());
                }
            }
        }
        index
    }
}

fn normalize_state(state: &str) -> String {
    state.trim().to_lowercase()
}

impl CorpusSnapshot {
    /// The empty corpus at version 0.
    pub fn empty() -> Self {
        Self {
            version: CorpusVersion::ZERO,
            schemes: BTreeMap::new(),
            index: PrefilterIndex::default(),
            quarantined: BTreeMap::new(),
        }
    }

    /// Builds a snapshot from records. Invalid records are quarantined.
    pub fn from_schemes<I>(version: CorpusVersion, schemes: I) -> Self
    where
        I: IntoIterator<Item = Scheme>,
    {
        let schemes = schemes
            .into_iter()
            .map(|s| (s.id().to_string(), Arc::new(s)))
            .collect();
        Self::assemble(version, schemes, BTreeMap::new())
    }

    /// Builds a snapshot from persisted records carrying their stored hash.
    ///
    /// A record whose stored hash disagrees with its recomputed hash is kept
    /// but quarantined.
    pub fn from_stored<I>(version: CorpusVersion, records: I) -> Self
    where
        I: IntoIterator<Item = (Scheme, ContentHash)>,
    {
        let mut schemes = BTreeMap::new();
        let mut quarantined = BTreeMap::new();
        for (scheme, stored_hash) in records {
            if scheme.content_hash() != stored_hash {
                quarantined.insert(
                    scheme.id().to_string(),
                    format!(
                        "stored hash {} does not match content hash {}",
                        stored_hash,
                        scheme.content_hash()
                    ),
                );
            }
            schemes.insert(scheme.id().to_string(), Arc::new(scheme));
        }
        Self::assemble(version, schemes, quarantined)
    }

    fn assemble(
        version: CorpusVersion,
        schemes: BTreeMap<String, Arc<Scheme>>,
        mut quarantined: BTreeMap<String, String>,
    ) -> Self {
        for (id, scheme) in &schemes {
            if quarantined.contains_key(id) {
                continue;
            }
            if let Err(e) = SchemeValidator::validate(scheme) {
                quarantined.insert(id.clone(), e.to_string());
            }
        }
        let index = PrefilterIndex::build(&schemes);
        Self {
            version,
            schemes,
            index,
            quarantined,
        }
    }

    /// Produces the snapshot that results from applying effective operations.
    ///
    /// Operations must already be validated and reduced to real changes.
    pub(crate) fn apply_ops(&self, version: CorpusVersion, ops: &[DeltaOp]) -> Self {
        let mut schemes = self.schemes.clone();
        let mut quarantined = self.quarantined.clone();
        for op in ops {
            quarantined.remove(op.scheme_id());
            match op {
                DeltaOp::Add { scheme } | DeltaOp::Update { scheme } => {
                    schemes.insert(scheme.id().to_string(), Arc::new(scheme.clone()));
                }
                DeltaOp::Remove { scheme_id, .. } => {
                    schemes.remove(scheme_id);
                }
            }
        }
        Self::assemble(version, schemes, quarantined)
    }

    pub fn version(&self) -> CorpusVersion {
        self.version
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Scheme>> {
        self.schemes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.schemes.contains_key(id)
    }

    /// Stored hash for an id, if present.
    pub fn content_hash(&self, id: &str) -> Option<ContentHash> {
        self.schemes.get(id).map(|s| s.content_hash())
    }

    /// All records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Scheme>> {
        self.schemes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// Why a record is excluded from matching, if it is.
    pub fn quarantine_reason(&self, id: &str) -> Option<&str> {
        self.quarantined.get(id).map(String::as_str)
    }

    pub fn quarantined(&self) -> impl Iterator<Item = (&str, &str)> {
        self.quarantined
            .iter()
            .map(|(id, reason)| (id.as_str(), reason.as_str()))
    }

    /// Distinct categories present, sorted.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.schemes.values().map(|s| s.category()).collect()
    }

    /// Candidate ids for a profile's state, in id order.
    ///
    /// Returns nationwide schemes plus schemes restricted to `state`.
    pub fn candidate_ids(&self, state: &str) -> Vec<&str> {
        let local = self.index.by_state.get(&normalize_state(state));
        let mut ids: Vec<&str> = self
            .index
            .nationwide
            .iter()
            .chain(local.into_iter().flatten())
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Operations that transform `older` into this snapshot.
    ///
    /// Adds and updates carry the current payload; removals carry the hash
    /// of the record being removed. Ordered by scheme id.
    pub fn diff_from(&self, older: &CorpusSnapshot) -> Vec<DeltaOp> {
        let mut ops = Vec::new();
        let ids: BTreeSet<&String> = self.schemes.keys().chain(older.schemes.keys()).collect();
        for id in ids {
            match (older.schemes.get(id), self.schemes.get(id)) {
                (None, Some(new)) => ops.push(DeltaOp::Add {
                    scheme: new.as_ref().clone(),
                }),
                (Some(old), Some(new)) if old.content_hash() != new.content_hash() => {
                    ops.push(DeltaOp::Update {
                        scheme: new.as_ref().clone(),
                    })
                }
                (Some(old), None) => ops.push(DeltaOp::Remove {
                    scheme_id: id.clone(),
                    content_hash: Some(old.content_hash()),
                }),
                _ => {}
            }
        }
        ops
    }
}
