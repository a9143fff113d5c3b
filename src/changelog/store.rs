//! On-disk corpus layout
//!
//! ```text
//! <data_dir>/corpus/
//!   records.json   full corpus at the table version
//!   changes.log    framed, append-only, one frame per applied delta
//! ```
//!
//! Apply order is: append frame (fsync), publish in memory, rewrite table.
//! On open the table is loaded and every log frame newer than the table
//! version is handed back for replay.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::observability::Event;

use super::errors::{ChangeLogError, ChangeLogResult};
use super::reader::ChangeLogReader;
use super::record::ChangeLogRecord;
use super::table::RecordTable;
use super::writer::ChangeLogWriter;

const CORPUS_DIR: &str = "corpus";
const TABLE_FILE: &str = "records.json";
const LOG_FILE: &str = "changes.log";

/// State recovered from disk on open.
#[derive(Debug)]
pub struct RecoveredCorpus {
    pub table: RecordTable,
    /// Log records newer than the table, in version order.
    pub tail: Vec<ChangeLogRecord>,
    /// A partial frame was found and truncated.
    pub torn_tail: bool,
}

impl RecoveredCorpus {
    /// Version the corpus will have once the tail is replayed.
    pub fn version(&self) -> u64 {
        self.tail
            .last()
            .map(|r| r.version)
            .unwrap_or(self.table.version)
    }
}

/// Persistence handle owned by the corpus writer.
pub struct CorpusStore {
    dir: PathBuf,
    writer: ChangeLogWriter,
}

impl CorpusStore {
    /// Opens (or creates) `<data_dir>/corpus` and recovers its contents.
    pub fn open(data_dir: &Path) -> ChangeLogResult<(Self, RecoveredCorpus)> {
        let dir = data_dir.join(CORPUS_DIR);
        let table = RecordTable::load(&dir.join(TABLE_FILE))?;
        let log_path = dir.join(LOG_FILE);
        let scan = ChangeLogReader::scan(&log_path)?;

        if scan.torn_tail {
            warn!(
                event = Event::ChangeLogTornTail.as_str(),
                valid_len = scan.valid_len,
                "truncating partial change log frame"
            );
        }

        let tail: Vec<ChangeLogRecord> = scan
            .records
            .into_iter()
            .filter(|r| r.version > table.version)
            .collect();
        if let Some(first) = tail.first() {
            if first.version != table.version + 1 {
                return Err(ChangeLogError::NonSequential {
                    expected: table.version + 1,
                    found: first.version,
                });
            }
        }

        let writer = ChangeLogWriter::open(&log_path, scan.valid_len)?;
        Ok((
            Self { dir, writer },
            RecoveredCorpus {
                table,
                tail,
                torn_tail: scan.torn_tail,
            },
        ))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Appends one applied delta and fsyncs.
    pub fn append(&mut self, record: &ChangeLogRecord) -> ChangeLogResult<()> {
        self.writer.append(record)
    }

    /// Replaces the record table atomically.
    pub fn write_table(&self, table: &RecordTable) -> ChangeLogResult<()> {
        table.write_atomic(&self.dir.join(TABLE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::DeltaOp;
    use crate::scheme::{Scheme, SchemeContent, SchemeLevel};
    use tempfile::TempDir;

    fn add(version: u64, id: &str) -> ChangeLogRecord {
        ChangeLogRecord::new(
            version,
            vec![DeltaOp::Add {
                scheme: Scheme::new(id, SchemeContent::new("pension", SchemeLevel::Central)),
            }],
        )
    }

    #[test]
    fn test_fresh_directory() {
        let tmp = TempDir::new().unwrap();
        let (store, recovered) = CorpusStore::open(tmp.path()).unwrap();
        assert_eq!(recovered.version(), 0);
        assert!(recovered.tail.is_empty());
        assert!(store.dir().ends_with("corpus"));
    }

    #[test]
    fn test_tail_excludes_versions_in_table() {
        let tmp = TempDir::new().unwrap();
        {
            let (mut store, _) = CorpusStore::open(tmp.path()).unwrap();
            store.append(&add(1, "A")).unwrap();
            store.append(&add(2, "B")).unwrap();
            let mut table = RecordTable::new(1);
            table.insert(Scheme::new(
                "A",
                SchemeContent::new("pension", SchemeLevel::Central),
            ));
            store.write_table(&table).unwrap();
        }

        let (_, recovered) = CorpusStore::open(tmp.path()).unwrap();
        assert_eq!(recovered.table.version, 1);
        assert_eq!(recovered.tail.len(), 1);
        assert_eq!(recovered.tail[0].version, 2);
        assert_eq!(recovered.version(), 2);
    }
}
