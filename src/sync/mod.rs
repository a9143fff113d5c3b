//! Corpus synchronization against a remote authority
//!
//! - Only records whose hash differs (or that are new) are fetched
//! - Every fetched payload must hash to its manifest entry
//! - Verified payloads are checkpointed in batches for resumption
//! - Exhausted retries flag the corpus stale; matching keeps serving

mod checkpoint;
mod engine;
mod errors;
mod remote;
mod retry;

pub use checkpoint::{CheckpointFile, SyncCheckpoint};
pub use engine::{
    CancelSignal, SyncEngine, SyncOutcome, SyncReport, DEFAULT_CHECKPOINT_INTERVAL,
};
pub use errors::{RemoteError, SyncError, SyncResult};
pub use remote::{Manifest, ManifestEntry, RemoteAuthority};
pub use retry::RetryPolicy;
