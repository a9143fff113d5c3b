//! yojana - deterministic eligibility matching over a versioned scheme corpus
//!
//! - `corpus`: immutable versioned snapshots, atomic deltas, change events
//! - `changelog`: on-disk record table and checksummed change log
//! - `matching`: pure profile x snapshot evaluation and ranking
//! - `sync`: reconciliation with a remote authority
//! - `notify`: change-triggered and scheduled notification requests

pub mod changelog;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod matching;
pub mod notify;
pub mod observability;
pub mod profile;
pub mod scheme;
pub mod sync;
