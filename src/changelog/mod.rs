//! Corpus persistence: framed change log plus versioned record table
//!
//! - Every applied delta is appended and fsynced before it is visible
//! - Frames carry CRC32 checksums; a bad checksum halts recovery
//! - A partial trailing frame is treated as never written
//! - The record table is rewritten atomically after each apply

mod checksum;
mod errors;
mod reader;
mod record;
mod store;
mod table;
mod writer;

pub use errors::{ChangeLogError, ChangeLogResult};
pub use reader::{ChangeLogReader, LogScan};
pub use record::ChangeLogRecord;
pub use store::{CorpusStore, RecoveredCorpus};
pub use table::{RecordTable, StoredRecord};
pub use writer::ChangeLogWriter;
