//! Change log writer with fsync enforcement
//!
//! - Append-only, one frame per applied delta
//! - Every append is followed by fsync before the version is published
//! - A torn tail left by a crash is truncated on open
//! - A failed append is cut back off the file before the error is returned

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::error;

use super::errors::{ChangeLogError, ChangeLogResult};
use super::record::ChangeLogRecord;
use crate::observability::Event;

/// Append-only writer for `changes.log`.
pub struct ChangeLogWriter {
    path: PathBuf,
    file: File,
}

impl ChangeLogWriter {
    /// Opens or creates the log, truncating it to `valid_len` first.
    ///
    /// `valid_len` comes from a prior scan; bytes past it belong to a torn
    /// frame that was never acknowledged.
    pub fn open(path: &Path, valid_len: u64) -> ChangeLogResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ChangeLogError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                ChangeLogError::io(format!("Failed to open change log {}", path.display()), e)
            })?;

        let current_len = file
            .metadata()
            .map_err(|e| ChangeLogError::io("Failed to read change log metadata", e))?
            .len();
        if current_len > valid_len {
            file.set_len(valid_len)
                .map_err(|e| ChangeLogError::io("Failed to truncate torn change log tail", e))?;
            file.sync_all()
                .map_err(|e| ChangeLogError::io("Failed to fsync change log", e))?;
        }
        drop(file);

        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| {
                ChangeLogError::io(format!("Failed to open change log {}", path.display()), e)
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record and fsyncs.
    ///
    /// On failure the log is truncated back to its length before the call,
    /// so an unacknowledged frame never sits in front of the next append.
    pub fn append(&mut self, record: &ChangeLogRecord) -> ChangeLogResult<()> {
        let frame = record.encode()?;
        let start = self
            .file
            .metadata()
            .map_err(|e| ChangeLogError::io("Failed to read change log metadata", e))?
            .len();
        if let Err(e) = self.write_frame(&frame) {
            self.rollback(start);
            return Err(e);
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> ChangeLogResult<()> {
        self.file
            .write_all(frame)
            .map_err(|e| ChangeLogError::io("Failed to append change log frame", e))?;
        self.file
            .sync_all()
            .map_err(|e| ChangeLogError::io("Failed to fsync change log", e))
    }

    /// Cuts the log back to `len`. If even that fails, the next open sees the
    /// leftover bytes as a torn tail or as corruption.
    fn rollback(&mut self, len: u64) {
        let result = self.file.set_len(len).and_then(|_| self.file.sync_all());
        match result {
            Ok(()) => error!(
                event = Event::ChangeLogRollback.as_str(),
                len,
                "failed change log append rolled back"
            ),
            Err(e) => error!(
                event = Event::ChangeLogRollback.as_str(),
                len,
                error = %e,
                "failed change log append could not be rolled back"
            ),
        }
    }
}
