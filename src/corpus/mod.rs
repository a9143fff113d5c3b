//! Scheme corpus: versioned, immutable snapshots with single-writer deltas
//!
//! - Snapshots never mutate once issued
//! - Versions strictly increase by one per effective apply
//! - A delta is applied whole or not at all
//! - One change event per effective operation, delivered in version order

mod delta;
mod errors;
mod snapshot;
mod store;
mod version;

pub use delta::{AppliedDelta, ChangeEvent, ChangeKind, Delta, DeltaOp};
pub use errors::{CorpusError, CorpusErrorCode, CorpusResult, Severity};
pub use snapshot::CorpusSnapshot;
pub use store::{CorpusStatus, SchemeCorpus, DEFAULT_HISTORY_RETENTION};
pub use version::CorpusVersion;
