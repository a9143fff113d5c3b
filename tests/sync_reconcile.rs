//! Sync Engine Reconciliation Tests
//!
//! - Only records whose manifest hash differs from the local hash are fetched
//! - A payload that fails its hash check is never applied
//! - Exhausted retries leave the corpus serving its last good snapshot,
//!   flagged stale
//! - A cancelled cycle resumes without refetching verified records

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use yojana::corpus::{ChangeKind, CorpusVersion, Delta, SchemeCorpus};
use yojana::scheme::{Scheme, SchemeContent, SchemeLevel};
use yojana::sync::{
    CancelSignal, CheckpointFile, Manifest, RemoteAuthority, RemoteError, RetryPolicy,
    SyncEngine, SyncOutcome,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn scheme(id: &str) -> Scheme {
    Scheme::new(id, SchemeContent::new("education", SchemeLevel::Central))
}

fn revised(id: &str) -> Scheme {
    Scheme::new(
        id,
        SchemeContent::new("education", SchemeLevel::Central).with_benefits("revised"),
    )
}

fn ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("S{:04}", i)).collect()
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 4,
        multiplier: 2.0,
        fetch_timeout_ms: 200,
    }
}

fn corpus_with(schemes: Vec<Scheme>) -> Arc<SchemeCorpus> {
    let corpus = SchemeCorpus::in_memory(16);
    let delta = schemes.into_iter().fold(Delta::new(), Delta::add);
    corpus.apply_delta(&delta).expect("seed corpus");
    Arc::new(corpus)
}

/// In-memory authority that counts calls and can misbehave on request.
#[derive(Default)]
struct FakeAuthority {
    records: Mutex<BTreeMap<String, Scheme>>,
    /// Served by `fetch_record` in place of the listed record.
    tampered: Mutex<BTreeMap<String, Scheme>>,
    manifest_failures: AtomicUsize,
    manifest_calls: AtomicUsize,
    record_calls: AtomicUsize,
    /// Listed in the manifest but answered with `NotFound`.
    withheld: Mutex<BTreeSet<String>>,
    cancel_after: Mutex<Option<(usize, CancelSignal)>>,
    /// Checkpoint file to inspect at each record fetch.
    watched_checkpoint: Mutex<Option<PathBuf>>,
    /// Confirmed records on disk as seen at each record fetch.
    checkpoint_seen: Mutex<Vec<usize>>,
}

impl FakeAuthority {
    fn with(schemes: Vec<Scheme>) -> Arc<Self> {
        let authority = Self::default();
        {
            let mut records = authority.records.lock().unwrap();
            for s in schemes {
                records.insert(s.id().to_string(), s);
            }
        }
        Arc::new(authority)
    }

    fn fail_manifest(&self, times: usize) {
        self.manifest_failures.store(times, Ordering::SeqCst);
    }

    fn tamper(&self, scheme: Scheme) {
        self.tampered
            .lock()
            .unwrap()
            .insert(scheme.id().to_string(), scheme);
    }

    fn withhold(&self, scheme_id: &str) {
        self.withheld.lock().unwrap().insert(scheme_id.to_string());
    }

    fn cancel_after(&self, fetches: usize, signal: CancelSignal) {
        *self.cancel_after.lock().unwrap() = Some((fetches, signal));
    }

    fn watch_checkpoint(&self, path: PathBuf) {
        *self.watched_checkpoint.lock().unwrap() = Some(path);
    }

    fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteAuthority for FakeAuthority {
    async fn fetch_manifest(&self, _since: CorpusVersion) -> Result<Manifest, RemoteError> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.manifest_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.manifest_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::Transient("connection reset".to_string()));
        }
        let records = self.records.lock().unwrap();
        Ok(Manifest::describing(records.values()))
    }

    async fn fetch_record(&self, scheme_id: &str) -> Result<Scheme, RemoteError> {
        let calls = self.record_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(path) = self.watched_checkpoint.lock().unwrap().as_ref() {
            let on_disk = CheckpointFile::new(path).load().expect("checkpoint readable");
            self.checkpoint_seen.lock().unwrap().push(on_disk.len());
        }
        if let Some((after, signal)) = self.cancel_after.lock().unwrap().as_ref() {
            if calls >= *after {
                signal.cancel();
            }
        }
        if self.withheld.lock().unwrap().contains(scheme_id) {
            return Err(RemoteError::NotFound(scheme_id.to_string()));
        }
        if let Some(s) = self.tampered.lock().unwrap().get(scheme_id) {
            return Ok(s.clone());
        }
        self.records
            .lock()
            .unwrap()
            .get(scheme_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(scheme_id.to_string()))
    }
}

// =============================================================================
// Delta minimality
// =============================================================================

#[tokio::test]
async fn test_only_changed_records_are_fetched() {
    let all = ids(1000);
    let corpus = corpus_with(all.iter().map(|id| scheme(id)).collect());
    let changed = ["S0007", "S0500", "S0999"];
    let remote = FakeAuthority::with(
        all.iter()
            .map(|id| {
                if changed.contains(&id.as_str()) {
                    revised(id)
                } else {
                    scheme(id)
                }
            })
            .collect(),
    );

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.outcome, SyncOutcome::Applied);
    assert_eq!(report.manifest_entries, 1000);
    assert_eq!(report.fetched, 3);
    assert_eq!(remote.record_calls(), 3);
    assert_eq!(report.version, CorpusVersion::new(2));

    let snapshot = corpus.current_snapshot();
    for id in changed {
        assert_eq!(snapshot.content_hash(id), Some(revised(id).content_hash()));
    }
    assert_eq!(snapshot.len(), 1000);
}

#[tokio::test]
async fn test_matching_manifest_is_up_to_date() {
    let all: Vec<Scheme> = ids(20).iter().map(|id| scheme(id)).collect();
    let corpus = corpus_with(all.clone());
    let remote = FakeAuthority::with(all);

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.outcome, SyncOutcome::UpToDate);
    assert_eq!(remote.record_calls(), 0);
    assert_eq!(corpus.version(), CorpusVersion::new(1));
    assert!(corpus.status().last_synced_at.is_some());
}

#[tokio::test]
async fn test_unlisted_local_records_are_removed() {
    let corpus = corpus_with(vec![scheme("KEEP"), scheme("GONE")]);
    let remote = FakeAuthority::with(vec![scheme("KEEP"), scheme("ADDED")]);
    let mut rx = corpus.subscribe();

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.removed, 1);
    assert_eq!(report.fetched, 1);
    let snapshot = corpus.current_snapshot();
    assert!(snapshot.contains("ADDED"));
    assert!(!snapshot.contains("GONE"));

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push((event.scheme_id, event.kind));
    }
    kinds.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        kinds,
        vec![
            ("ADDED".to_string(), ChangeKind::Added),
            ("GONE".to_string(), ChangeKind::Removed),
        ]
    );
}

// =============================================================================
// Integrity
// =============================================================================

#[tokio::test]
async fn test_hash_mismatch_is_never_applied() {
    let corpus = corpus_with(vec![scheme("A"), scheme("B")]);
    let remote = FakeAuthority::with(vec![revised("A"), revised("B")]);
    // The manifest advertises revised("B"); the payload served differs.
    remote.tamper(Scheme::new(
        "B",
        SchemeContent::new("education", SchemeLevel::Central).with_benefits("tampered"),
    ));

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.outcome, SyncOutcome::Applied);
    assert_eq!(report.integrity_failures, vec!["B".to_string()]);
    let snapshot = corpus.current_snapshot();
    assert_eq!(snapshot.content_hash("A"), Some(revised("A").content_hash()));
    assert_eq!(snapshot.content_hash("B"), Some(scheme("B").content_hash()));
}

#[tokio::test]
async fn test_payload_under_wrong_id_is_rejected() {
    let corpus = corpus_with(vec![]);
    let remote = FakeAuthority::with(vec![scheme("A")]);
    // Same content, so the hash matches, but the record claims another id.
    remote
        .tampered
        .lock()
        .unwrap()
        .insert("A".to_string(), Scheme::new("Z", scheme("A").content().clone()));

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.integrity_failures, vec!["A".to_string()]);
    assert!(corpus.current_snapshot().is_empty());
    assert_eq!(corpus.version(), CorpusVersion::ZERO);
}

// =============================================================================
// Retry and staleness
// =============================================================================

#[tokio::test]
async fn test_transient_manifest_failures_are_retried() {
    let corpus = corpus_with(vec![]);
    let remote = FakeAuthority::with(vec![scheme("A")]);
    remote.fail_manifest(2);

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.outcome, SyncOutcome::Applied);
    assert_eq!(remote.manifest_calls.load(Ordering::SeqCst), 3);
    assert!(!corpus.is_stale());
}

#[tokio::test]
async fn test_exhausted_retries_mark_corpus_stale() {
    let corpus = corpus_with(vec![scheme("A")]);
    let remote = FakeAuthority::with(vec![revised("A")]);
    remote.fail_manifest(usize::MAX);

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.outcome, SyncOutcome::Stale);
    assert!(report.error.is_some());
    assert_eq!(remote.manifest_calls.load(Ordering::SeqCst), 3);
    assert!(corpus.is_stale());
    assert!(corpus.status().stale);
    assert_eq!(corpus.version(), CorpusVersion::new(1));
    assert_eq!(
        corpus.current_snapshot().content_hash("A"),
        Some(scheme("A").content_hash())
    );

    // A later successful cycle clears the flag.
    remote.fail_manifest(0);
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");
    assert_eq!(report.outcome, SyncOutcome::Applied);
    assert!(!corpus.is_stale());
}

#[tokio::test]
async fn test_missing_remote_record_is_skipped() {
    let corpus = corpus_with(vec![]);
    let remote = FakeAuthority::with(vec![scheme("A"), scheme("B"), scheme("GHOST")]);
    remote.withhold("GHOST");

    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");

    assert_eq!(report.outcome, SyncOutcome::Applied);
    assert_eq!(report.skipped, vec!["GHOST".to_string()]);
    assert_eq!(remote.record_calls(), 3);
    let snapshot = corpus.current_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.contains("GHOST"));
}

// =============================================================================
// Cancellation and resumption
// =============================================================================

#[tokio::test]
async fn test_cancelled_cycle_resumes_from_checkpoint() {
    let tmp = TempDir::new().expect("temp dir");
    let checkpoint_path = tmp.path().join("sync.checkpoint");
    let corpus = corpus_with(vec![]);
    let remote = FakeAuthority::with(ids(5).iter().map(|id| scheme(id)).collect());

    let first_signal = CancelSignal::new();
    remote.cancel_after(2, first_signal.clone());
    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy())
        .with_checkpoint_file(CheckpointFile::new(&checkpoint_path))
        .expect("checkpoint file");
    let report = engine.reconcile(&first_signal).await.expect("reconcile");

    assert_eq!(report.outcome, SyncOutcome::Cancelled);
    assert_eq!(report.fetched, 2);
    assert_eq!(corpus.version(), CorpusVersion::ZERO);
    assert!(checkpoint_path.exists());

    // A fresh engine picks up the persisted checkpoint.
    *remote.cancel_after.lock().unwrap() = None;
    let resumed = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy())
        .with_checkpoint_file(CheckpointFile::new(&checkpoint_path))
        .expect("checkpoint file");
    assert_eq!(resumed.checkpointed(), 2);

    let report = resumed.reconcile(&CancelSignal::new()).await.expect("reconcile");
    assert_eq!(report.outcome, SyncOutcome::Applied);
    assert_eq!(report.reused, 2);
    assert_eq!(report.fetched, 3);
    assert_eq!(remote.record_calls(), 5);
    assert_eq!(corpus.current_snapshot().len(), 5);
    assert_eq!(resumed.checkpointed(), 0);
    assert!(!checkpoint_path.exists());
}

#[tokio::test]
async fn test_checkpoint_written_in_batches() {
    let tmp = TempDir::new().expect("temp dir");
    let checkpoint_path = tmp.path().join("sync.checkpoint");
    let corpus = corpus_with(Vec::new());
    let remote = FakeAuthority::with(ids(7).iter().map(|id| scheme(id)).collect());
    remote.watch_checkpoint(checkpoint_path.clone());
    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy())
        .with_checkpoint_file(CheckpointFile::new(&checkpoint_path))
        .expect("checkpoint file")
        .with_checkpoint_interval(3);

    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");
    assert_eq!(report.outcome, SyncOutcome::Applied);
    assert_eq!(report.fetched, 7);
    // Saved after the third and sixth verified records only.
    assert_eq!(*remote.checkpoint_seen.lock().unwrap(), vec![0, 0, 0, 3, 3, 3, 6]);
    assert!(!checkpoint_path.exists());
}

#[tokio::test]
async fn test_checkpointed_payload_refetched_when_remote_changes() {
    let corpus = corpus_with(vec![]);
    let remote = FakeAuthority::with(ids(3).iter().map(|id| scheme(id)).collect());

    let signal = CancelSignal::new();
    remote.cancel_after(1, signal.clone());
    let engine = SyncEngine::new(Arc::clone(&corpus), remote.clone(), fast_policy());
    let report = engine.reconcile(&signal).await.expect("reconcile");
    assert_eq!(report.outcome, SyncOutcome::Cancelled);
    assert_eq!(engine.checkpointed(), 1);

    // The authority revises the checkpointed record before the retry.
    *remote.cancel_after.lock().unwrap() = None;
    remote
        .records
        .lock()
        .unwrap()
        .insert("S0000".to_string(), revised("S0000"));

    let report = engine.reconcile(&CancelSignal::new()).await.expect("reconcile");
    assert_eq!(report.reused, 0);
    assert_eq!(report.fetched, 3);
    assert_eq!(
        corpus.current_snapshot().content_hash("S0000"),
        Some(revised("S0000").content_hash())
    );
}
