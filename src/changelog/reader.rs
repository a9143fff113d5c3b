//! Change log reader with strict corruption detection
//!
//! - Frames are read strictly in file order
//! - Versions must be contiguous
//! - A complete frame with a bad checksum is corruption and halts the read
//! - A frame cut short at end of file is a torn tail: the append that wrote
//!   it never completed, so it never acknowledged a version. The reader
//!   stops there and reports the last good offset.
//! - A frame whose length overruns the file while intact frames still follow
//!   it has a damaged length field. That is corruption, not a torn tail.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::checksum::verify_checksum;
use super::errors::{ChangeLogError, ChangeLogResult};
use super::record::{ChangeLogRecord, HEADER_SIZE, TRAILER_SIZE};

/// Sequential reader over a change log file.
pub struct ChangeLogReader {
    reader: BufReader<File>,
    offset: u64,
    file_size: u64,
    last_version: Option<u64>,
    torn_tail: bool,
}

/// Everything recovered from one full scan.
#[derive(Debug)]
pub struct LogScan {
    pub records: Vec<ChangeLogRecord>,
    /// Byte length of the intact prefix.
    pub valid_len: u64,
    /// True when a partial trailing frame was found past `valid_len`.
    pub torn_tail: bool,
}

impl ChangeLogReader {
    /// Opens a change log for reading.
    pub fn open(path: &Path) -> ChangeLogResult<Self> {
        let file = File::open(path).map_err(|e| {
            ChangeLogError::io(format!("Failed to open change log {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| ChangeLogError::io("Failed to read change log metadata", e))?
            .len();
        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
            file_size,
            last_version: None,
            torn_tail: false,
        })
    }

    /// Reads every intact record. A missing file is an empty log.
    pub fn scan(path: &Path) -> ChangeLogResult<LogScan> {
        if !path.exists() {
            return Ok(LogScan {
                records: Vec::new(),
                valid_len: 0,
                torn_tail: false,
            });
        }
        let mut reader = Self::open(path)?;
        let mut records = Vec::new();
        while let Some(record) = reader.read_next()? {
            records.push(record);
        }
        Ok(LogScan {
            records,
            valid_len: reader.offset,
            torn_tail: reader.torn_tail,
        })
    }

    /// Byte offset of the next unread frame.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` for an intact frame
    /// - `Ok(None)` at clean end of file or at a torn tail
    /// - `Err` on checksum failure or non-contiguous versions
    pub fn read_next(&mut self) -> ChangeLogResult<Option<ChangeLogRecord>> {
        if self.torn_tail || self.offset >= self.file_size {
            return Ok(None);
        }

        let mut len_buf = [0u8; 4];
        if !self.read_fully(&mut len_buf)? {
            return Ok(None);
        }
        let frame_len = u32::from_le_bytes(len_buf) as usize;
        if frame_len < 8 {
            return Err(ChangeLogError::corruption(
                self.offset,
                format!("invalid frame length {}", frame_len),
            ));
        }

        let remaining = self.file_size - self.offset;
        if (4 + frame_len + TRAILER_SIZE) as u64 > remaining {
            return self.overrun(frame_len, remaining);
        }

        let mut body = vec![0u8; frame_len];
        if !self.read_fully(&mut body)? {
            return Ok(None);
        }
        let mut crc_buf = [0u8; TRAILER_SIZE];
        if !self.read_fully(&mut crc_buf)? {
            return Ok(None);
        }

        let record = ChangeLogRecord::decode(&body, u32::from_le_bytes(crc_buf), self.offset)?;
        if let Some(last) = self.last_version {
            if record.version != last + 1 {
                return Err(ChangeLogError::NonSequential {
                    expected: last + 1,
                    found: record.version,
                });
            }
        }

        self.last_version = Some(record.version);
        self.offset += (4 + frame_len + TRAILER_SIZE) as u64;
        Ok(Some(record))
    }

    /// Handles a frame whose declared length runs past end of file.
    ///
    /// If nothing intact follows, this is the last append cut short. If an
    /// intact newer frame is found in the bytes after the length field, the
    /// length itself is damaged and acknowledged versions sit behind it.
    fn overrun(
        &mut self,
        frame_len: usize,
        remaining: u64,
    ) -> ChangeLogResult<Option<ChangeLogRecord>> {
        let mut rest = Vec::new();
        self.reader
            .read_to_end(&mut rest)
            .map_err(|e| ChangeLogError::io("Failed to read change log", e))?;

        let floor = self.last_version.unwrap_or(0);
        let follows = (0..rest.len()).any(|start| {
            intact_frame_version(&rest[start..]).is_some_and(|version| version > floor)
        });
        if follows {
            return Err(ChangeLogError::corruption(
                self.offset,
                format!(
                    "frame length {} exceeds remaining {} bytes but intact frames follow",
                    frame_len, remaining
                ),
            ));
        }

        self.torn_tail = true;
        Ok(None)
    }

    /// Fills `buf` completely. Returns `false` (and marks a torn tail) on a
    /// short read at end of file.
    fn read_fully(&mut self, buf: &mut [u8]) -> ChangeLogResult<bool> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.torn_tail = true;
                Ok(false)
            }
            Err(e) => Err(ChangeLogError::io("Failed to read change log", e)),
        }
    }
}

/// Version of the complete, checksum-valid frame starting at `bytes[0]`.
fn intact_frame_version(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < HEADER_SIZE + TRAILER_SIZE {
        return None;
    }
    let frame_len = u32::from_le_bytes(bytes[..4].try_into().ok()?) as usize;
    let end = 4usize.checked_add(frame_len)?;
    if frame_len < 8 || end + TRAILER_SIZE > bytes.len() {
        return None;
    }
    let body = &bytes[4..end];
    let crc = u32::from_le_bytes(bytes[end..end + TRAILER_SIZE].try_into().ok()?);
    if !verify_checksum(&[body], crc) {
        return None;
    }
    Some(u64::from_le_bytes(body[..8].try_into().ok()?))
}
