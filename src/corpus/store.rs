//! SchemeCorpus - single-writer, multi-reader versioned scheme store
//!
//! - `current_snapshot()` never waits on an in-flight apply: the read lock
//!   guards only an `Arc` clone, and writers hold the write lock only to swap
//!   the pointer
//! - `apply_delta` calls are serialized; each successful apply with at least
//!   one effective change produces exactly version + 1
//! - A rejected delta leaves the corpus at its prior version
//! - Change events are delivered to subscribers in version order
//!
//! Effective operations are prepared against a base snapshot without holding
//! the writer lock. At commit the base version is re-checked; a writer that
//! lost the race rebuilds on the newer snapshot.

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::delta::{AppliedDelta, ChangeEvent, ChangeKind, Delta, DeltaOp};
use super::errors::{ConflictError, CorpusError, CorpusResult};
use super::snapshot::CorpusSnapshot;
use super::version::CorpusVersion;
use crate::changelog::{ChangeLogError, ChangeLogRecord, CorpusStore, RecordTable};
use crate::observability::Event;
use crate::scheme::SchemeValidator;

/// Snapshots kept for `get_since` when no retention is configured.
pub const DEFAULT_HISTORY_RETENTION: usize = 64;

/// Point-in-time health of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStatus {
    pub version: CorpusVersion,
    pub scheme_count: usize,
    pub quarantined_count: usize,
    /// Set when the last sync exhausted its retries.
    pub stale: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

struct WriterState {
    store: Option<CorpusStore>,
}

/// Versioned, immutable-snapshot scheme store.
pub struct SchemeCorpus {
    current: RwLock<Arc<CorpusSnapshot>>,
    writer: Mutex<WriterState>,
    history: Mutex<VecDeque<Arc<CorpusSnapshot>>>,
    retention: usize,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChangeEvent>>>,
    stale: AtomicBool,
    last_synced_at: Mutex<Option<DateTime<Utc>>>,
}

impl SchemeCorpus {
    /// An empty, memory-only corpus at version 0.
    pub fn in_memory(retention: usize) -> Self {
        Self::from_parts(Arc::new(CorpusSnapshot::empty()), None, retention)
    }

    /// Opens a persisted corpus under `data_dir`, replaying the change log.
    pub fn open(data_dir: &Path, retention: usize) -> CorpusResult<Self> {
        let (store, recovered) = CorpusStore::open(data_dir).map_err(open_error)?;

        let table_version = recovered.table.version;
        let mut snapshot = CorpusSnapshot::from_stored(
            CorpusVersion::new(table_version),
            recovered
                .table
                .records
                .into_values()
                .map(|r| (r.scheme, r.content_hash)),
        );
        for record in &recovered.tail {
            snapshot = snapshot.apply_ops(CorpusVersion::new(record.version), &record.ops);
        }

        for (id, reason) in snapshot.quarantined() {
            warn!(
                event = Event::IntegrityMismatch.as_str(),
                scheme_id = id,
                reason,
                "stored record quarantined"
            );
        }

        if !recovered.tail.is_empty() {
            store
                .write_table(&table_of(&snapshot))
                .map_err(|e| CorpusError::persistence("Failed to rewrite record table", e))?;
        }

        info!(
            event = Event::CorpusOpened.as_str(),
            version = snapshot.version().value(),
            schemes = snapshot.len(),
            replayed = recovered.tail.len(),
            torn_tail = recovered.torn_tail,
            "corpus opened"
        );

        Ok(Self::from_parts(Arc::new(snapshot), Some(store), retention))
    }

    fn from_parts(
        snapshot: Arc<CorpusSnapshot>,
        store: Option<CorpusStore>,
        retention: usize,
    ) -> Self {
        let retention = retention.max(1);
        let mut history = VecDeque::with_capacity(retention);
        history.push_back(Arc::clone(&snapshot));
        Self {
            current: RwLock::new(snapshot),
            writer: Mutex::new(WriterState { store }),
            history: Mutex::new(history),
            retention,
            subscribers: Mutex::new(Vec::new()),
            stale: AtomicBool::new(false),
            last_synced_at: Mutex::new(None),
        }
    }

    /// The latest published snapshot.
    pub fn current_snapshot(&self) -> Arc<CorpusSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn version(&self) -> CorpusVersion {
        self.current_snapshot().version()
    }

    /// Applies a delta atomically.
    ///
    /// Adds and updates whose payload hash equals the stored hash, and
    /// removals of absent ids, are dropped before commit. If nothing is left
    /// the version is unchanged and no events are emitted, which makes
    /// re-applying a delta a no-op.
    pub fn apply_delta(&self, delta: &Delta) -> CorpusResult<AppliedDelta> {
        if let Err(e) = validate_delta(delta) {
            warn!(
                event = Event::DeltaRejected.as_str(),
                code = e.code().code(),
                scheme_id = e.scheme_id().unwrap_or_default(),
                field = e.field().unwrap_or_default(),
                "delta rejected"
            );
            return Err(e);
        }

        loop {
            let base = self.current_snapshot();
            let ops = effective_ops(&base, delta);
            if ops.is_empty() {
                debug!(
                    event = Event::DeltaNoop.as_str(),
                    version = base.version().value(),
                    "delta already applied"
                );
                return Ok(AppliedDelta {
                    version: base.version(),
                    events: Vec::new(),
                });
            }

            match self.commit(&base, ops)? {
                Ok(applied) => return Ok(applied),
                Err(conflict) => {
                    debug!(
                        event = Event::DeltaRebased.as_str(),
                        expected = conflict.expected,
                        found = conflict.found,
                        "corpus moved during apply, rebuilding delta"
                    );
                }
            }
        }
    }

    fn commit(
        &self,
        base: &CorpusSnapshot,
        ops: Vec<DeltaOp>,
    ) -> CorpusResult<Result<AppliedDelta, ConflictError>> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| CorpusError::internal("corpus writer lock poisoned"))?;

        let current = self.current_snapshot();
        if current.version() != base.version() {
            return Ok(Err(ConflictError {
                expected: base.version().value(),
                found: current.version().value(),
            }));
        }

        let version = base.version().next();
        if let Some(store) = writer.store.as_mut() {
            store
                .append(&ChangeLogRecord::new(version.value(), ops.clone()))
                .map_err(|e| CorpusError::persistence("Failed to append change log", e))?;
        }

        let events = change_events(base, &ops, version);
        let next = Arc::new(base.apply_ops(version, &ops));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        self.remember(Arc::clone(&next));

        if let Some(store) = writer.store.as_ref() {
            // The log already holds this version; a failed rewrite is caught
            // up on the next open.
            if let Err(e) = store.write_table(&table_of(&next)) {
                error!(
                    event = Event::TableWriteFailed.as_str(),
                    version = version.value(),
                    error = %e,
                    "record table rewrite failed"
                );
            }
        }

        info!(
            event = Event::DeltaApplied.as_str(),
            version = version.value(),
            ops = ops.len(),
            "delta applied"
        );

        self.publish(&events);
        drop(writer);

        Ok(Ok(AppliedDelta { version, events }))
    }

    fn remember(&self, snapshot: Arc<CorpusSnapshot>) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_back(snapshot);
        while history.len() > self.retention {
            history.pop_front();
        }
    }

    fn publish(&self, events: &[ChangeEvent]) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }

    /// Registers a change event consumer.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// A retained historical snapshot.
    pub fn snapshot_at(&self, version: CorpusVersion) -> Option<Arc<CorpusSnapshot>> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.version() == version)
            .cloned()
    }

    /// Cumulative changes from `version` to current, ordered by scheme id.
    pub fn get_since(&self, version: CorpusVersion) -> CorpusResult<Delta> {
        let current = self.current_snapshot();
        if version == current.version() {
            return Ok(Delta::new());
        }
        let oldest = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .front()
            .map(|s| s.version())
            .unwrap_or_else(|| current.version());

        match self.snapshot_at(version) {
            Some(older) if version < current.version() => Ok(Delta {
                ops: current.diff_from(&older),
            }),
            _ => Err(CorpusError::version_unavailable(
                version.value(),
                oldest.value(),
                current.version().value(),
            )),
        }
    }

    pub fn status(&self) -> CorpusStatus {
        let snapshot = self.current_snapshot();
        CorpusStatus {
            version: snapshot.version(),
            scheme_count: snapshot.len(),
            quarantined_count: snapshot.quarantined().count(),
            stale: self.is_stale(),
            last_synced_at: *self
                .last_synced_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Flags the corpus as possibly behind the remote authority.
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    /// Records a completed sync.
    pub fn mark_fresh(&self, at: DateTime<Utc>) {
        self.stale.store(false, Ordering::SeqCst);
        *self
            .last_synced_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(at);
    }
}

fn open_error(err: ChangeLogError) -> CorpusError {
    if err.is_corruption() {
        error!(
            event = Event::ChangeLogCorruption.as_str(),
            error = %err,
            "change log failed verification"
        );
        CorpusError::log_corruption(err.to_string())
    } else {
        CorpusError::persistence("Failed to open corpus", err)
    }
}

/// Rejects duplicate ids and malformed payloads.
fn validate_delta(delta: &Delta) -> CorpusResult<()> {
    let mut seen = BTreeSet::new();
    for (position, op) in delta.ops.iter().enumerate() {
        if !seen.insert(op.scheme_id()) {
            return Err(CorpusError::duplicate_id(op.scheme_id(), position));
        }
        if let Some(scheme) = op.scheme() {
            SchemeValidator::validate(scheme).map_err(CorpusError::validation)?;
        }
    }
    Ok(())
}

/// Reduces a delta to the operations that change `base`.
fn effective_ops(base: &CorpusSnapshot, delta: &Delta) -> Vec<DeltaOp> {
    delta
        .ops
        .iter()
        .filter_map(|op| match op {
            DeltaOp::Add { scheme } | DeltaOp::Update { scheme } => {
                match base.content_hash(scheme.id()) {
                    Some(stored) if stored == scheme.content_hash() => None,
                    Some(_) => Some(DeltaOp::Update {
                        scheme: scheme.clone(),
                    }),
                    None => Some(DeltaOp::Add {
                        scheme: scheme.clone(),
                    }),
                }
            }
            DeltaOp::Remove { scheme_id, .. } => {
                base.content_hash(scheme_id).map(|stored| DeltaOp::Remove {
                    scheme_id: scheme_id.clone(),
                    content_hash: Some(stored),
                })
            }
        })
        .collect()
}

fn change_events(
    base: &CorpusSnapshot,
    ops: &[DeltaOp],
    version: CorpusVersion,
) -> Vec<ChangeEvent> {
    ops.iter()
        .map(|op| {
            let previous = base.get(op.scheme_id());
            let (kind, category, new_hash) = match op {
                DeltaOp::Add { scheme } => (
                    ChangeKind::Added,
                    scheme.category().to_string(),
                    Some(scheme.content_hash()),
                ),
                DeltaOp::Update { scheme } => (
                    ChangeKind::Updated,
                    scheme.category().to_string(),
                    Some(scheme.content_hash()),
                ),
                DeltaOp::Remove { .. } => (
                    ChangeKind::Removed,
                    previous.map(|s| s.category().to_string()).unwrap_or_default(),
                    None,
                ),
            };
            ChangeEvent {
                scheme_id: op.scheme_id().to_string(),
                kind,
                category,
                previous_hash: previous.map(|s| s.content_hash()),
                new_hash,
                version,
            }
        })
        .collect()
}

fn table_of(snapshot: &CorpusSnapshot) -> RecordTable {
    let mut table = RecordTable::new(snapshot.version().value());
    for scheme in snapshot.iter() {
        table.insert(scheme.as_ref().clone());
    }
    table
}
