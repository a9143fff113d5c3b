//! Reconciliation against the remote authority
//!
//! One cycle:
//! 1. Fetch the manifest (retried). Failure marks the corpus stale.
//! 2. Plan: ids whose hash differs or that are new are fetched; local ids
//!    the manifest does not list are removed.
//! 3. Fetch each planned record (retried, cancellable between records).
//!    A payload whose hash disagrees with its manifest entry is dropped and
//!    picked up again next cycle. Verified payloads are checkpointed every
//!    `checkpoint_interval` records, and again on cancel or stale.
//! 4. Apply the assembled delta in one `apply_delta` call.
//!
//! Network waits never overlap the corpus write lock: the lock is only
//! taken inside the final synchronous apply.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::checkpoint::{CheckpointFile, SyncCheckpoint};
use super::errors::{RemoteError, SyncError, SyncResult};
use super::remote::{ManifestEntry, RemoteAuthority};
use super::retry::RetryPolicy;
use crate::corpus::{ChangeKind, CorpusVersion, Delta, DeltaOp, SchemeCorpus};
use crate::observability::Event;
use crate::scheme::SchemeValidator;

/// Cooperative cancellation flag, checked between record fetches.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// A delta was applied.
    Applied,
    /// Local corpus already matched the manifest.
    UpToDate,
    /// Retries were exhausted; the corpus is flagged stale.
    Stale,
    /// Stopped on request; verified progress is checkpointed.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub base_version: CorpusVersion,
    pub version: CorpusVersion,
    pub manifest_entries: usize,
    /// Records requested from the remote this cycle.
    pub fetched: usize,
    /// Records taken from the checkpoint instead of refetched.
    pub reused: usize,
    pub removed: usize,
    /// Ids dropped because their payload failed the hash check.
    pub integrity_failures: Vec<String>,
    /// Ids dropped because the remote could not supply a usable record.
    pub skipped: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    fn new(base_version: CorpusVersion) -> Self {
        Self {
            outcome: SyncOutcome::UpToDate,
            base_version,
            version: base_version,
            manifest_entries: 0,
            fetched: 0,
            reused: 0,
            removed: 0,
            integrity_failures: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }
}

/// Verified records between checkpoint file rewrites.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 32;

/// The only writer of the corpus.
pub struct SyncEngine {
    corpus: Arc<SchemeCorpus>,
    remote: Arc<dyn RemoteAuthority>,
    policy: RetryPolicy,
    checkpoint: Mutex<SyncCheckpoint>,
    checkpoint_file: Option<CheckpointFile>,
    checkpoint_interval: usize,
}

impl SyncEngine {
    pub fn new(
        corpus: Arc<SchemeCorpus>,
        remote: Arc<dyn RemoteAuthority>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            corpus,
            remote,
            policy,
            checkpoint: Mutex::new(SyncCheckpoint::default()),
            checkpoint_file: None,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    /// Persists the checkpoint to `file`, resuming from whatever it holds.
    pub fn with_checkpoint_file(mut self, file: CheckpointFile) -> SyncResult<Self> {
        let loaded = file.load()?;
        self.checkpoint = Mutex::new(loaded);
        self.checkpoint_file = Some(file);
        Ok(self)
    }

    /// Rewrites the checkpoint file after every `records` verified payloads.
    pub fn with_checkpoint_interval(mut self, records: usize) -> Self {
        self.checkpoint_interval = records.max(1);
        self
    }

    pub fn corpus(&self) -> &Arc<SchemeCorpus> {
        &self.corpus
    }

    /// Number of verified payloads held for resumption.
    pub fn checkpointed(&self) -> usize {
        self.lock_checkpoint().len()
    }

    /// Runs one reconciliation cycle.
    ///
    /// Transient failures never surface as errors: they end the cycle with
    /// `SyncOutcome::Stale`. Errors are returned only when the corpus or the
    /// checkpoint store fails.
    pub async fn reconcile(&self, cancel: &CancelSignal) -> SyncResult<SyncReport> {
        let base = self.corpus.current_snapshot();
        let mut report = SyncReport::new(base.version());
        info!(
            event = Event::SyncStart.as_str(),
            version = base.version().value(),
            "reconciliation started"
        );

        let remote = self.remote.as_ref();
        let since = base.version();
        let manifest = match self
            .policy
            .run("fetch_manifest", || remote.fetch_manifest(since))
            .await
        {
            Ok(manifest) => manifest,
            Err(e) => return Ok(self.stale(report, e)),
        };
        if let Some(id) = manifest.duplicate_id() {
            let err = RemoteError::Protocol(format!("manifest lists '{}' more than once", id));
            return Ok(self.stale(report, err));
        }
        report.manifest_entries = manifest.entries.len();

        let mut to_fetch: Vec<&ManifestEntry> = manifest
            .entries
            .iter()
            .filter(|e| base.content_hash(&e.scheme_id) != Some(e.content_hash))
            .collect();
        to_fetch.sort_by(|a, b| a.scheme_id.cmp(&b.scheme_id));
        let listed: BTreeSet<&str> = manifest
            .entries
            .iter()
            .map(|e| e.scheme_id.as_str())
            .collect();
        let to_remove: Vec<&str> = base.ids().filter(|id| !listed.contains(id)).collect();

        self.lock_checkpoint().remote_version = manifest.remote_version;

        let mut delta = Delta::new();
        let mut unsaved = 0;
        for entry in to_fetch {
            if cancel.is_cancelled() {
                report.outcome = SyncOutcome::Cancelled;
                self.save_checkpoint()?;
                warn!(
                    event = Event::SyncCancelled.as_str(),
                    checkpointed = self.checkpointed(),
                    "reconciliation cancelled"
                );
                return Ok(report);
            }

            let reused = self.lock_checkpoint().confirmed_for(entry).cloned();
            if let Some(scheme) = reused {
                report.reused += 1;
                delta.ops.push(DeltaOp::Update { scheme });
                continue;
            }

            report.fetched += 1;
            let id = entry.scheme_id.as_str();
            let fetch = self.policy.run("fetch_record", || remote.fetch_record(id));
            let scheme = match fetch.await {
                Ok(scheme) => scheme,
                Err(e) if e.is_retryable() => {
                    self.save_checkpoint()?;
                    return Ok(self.stale(report, e));
                }
                Err(e) => {
                    warn!(
                        event = Event::RecordSkipped.as_str(),
                        scheme_id = id,
                        error = %e,
                        "remote record unavailable"
                    );
                    report.skipped.push(id.to_string());
                    continue;
                }
            };

            if scheme.id() != id || scheme.content_hash() != entry.content_hash {
                let err = SyncError::Integrity {
                    scheme_id: id.to_string(),
                    expected: entry.content_hash.to_hex(),
                    actual: scheme.content_hash().to_hex(),
                };
                warn!(
                    event = Event::IntegrityMismatch.as_str(),
                    scheme_id = id,
                    error = %err,
                    "fetched record dropped"
                );
                report.integrity_failures.push(id.to_string());
                continue;
            }
            if let Err(e) = SchemeValidator::validate(&scheme) {
                warn!(
                    event = Event::RecordSkipped.as_str(),
                    scheme_id = id,
                    error = %e,
                    "fetched record is malformed"
                );
                report.skipped.push(id.to_string());
                continue;
            }

            self.lock_checkpoint().confirm(scheme.clone());
            unsaved += 1;
            if unsaved >= self.checkpoint_interval {
                self.save_checkpoint()?;
                unsaved = 0;
            }
            delta.ops.push(DeltaOp::Update { scheme });
        }

        for id in to_remove {
            delta.ops.push(DeltaOp::Remove {
                scheme_id: id.to_string(),
                content_hash: base.content_hash(id),
            });
        }

        let applied = self.corpus.apply_delta(&delta)?;
        report.removed = applied
            .events
            .iter()
            .filter(|e| e.kind == ChangeKind::Removed)
            .count();
        report.version = applied.version;
        report.outcome = if applied.is_noop() {
            SyncOutcome::UpToDate
        } else {
            SyncOutcome::Applied
        };

        *self.lock_checkpoint() = SyncCheckpoint::default();
        if let Some(file) = &self.checkpoint_file {
            file.clear()?;
        }
        self.corpus.mark_fresh(Utc::now());

        info!(
            event = Event::SyncComplete.as_str(),
            version = report.version.value(),
            fetched = report.fetched,
            reused = report.reused,
            removed = report.removed,
            integrity_failures = report.integrity_failures.len(),
            "reconciliation complete"
        );
        Ok(report)
    }

    fn stale(&self, mut report: SyncReport, err: RemoteError) -> SyncReport {
        self.corpus.mark_stale();
        warn!(
            event = Event::SyncStale.as_str(),
            version = report.base_version.value(),
            error = %err,
            "sync failed, serving last good snapshot"
        );
        report.outcome = SyncOutcome::Stale;
        report.error = Some(err.to_string());
        report
    }

    fn save_checkpoint(&self) -> SyncResult<()> {
        let Some(file) = &self.checkpoint_file else {
            return Ok(());
        };
        let snapshot = self.lock_checkpoint().clone();
        file.save(&snapshot)?;
        debug!(
            event = Event::CheckpointSaved.as_str(),
            confirmed = snapshot.len(),
            "sync checkpoint saved"
        );
        Ok(())
    }

    fn lock_checkpoint(&self) -> std::sync::MutexGuard<'_, SyncCheckpoint> {
        self.checkpoint
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
