//! Change log record framing
//!
//! Each frame is:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, covers version + payload)
//! +------------------+
//! | Corpus Version   | (u64 LE)
//! +------------------+
//! | Payload          | (JSON: applied_at + effective ops)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over version + payload)
//! +------------------+
//! ```
//!
//! A record holds the effective operations of one successful apply, so
//! replaying records in version order reproduces the corpus exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{ChangeLogError, ChangeLogResult};
use crate::corpus::DeltaOp;

/// Bytes before the payload: length + version.
pub const HEADER_SIZE: usize = 4 + 8;
/// Bytes after the payload: checksum.
pub const TRAILER_SIZE: usize = 4;

/// One applied delta, keyed by the version it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogRecord {
    pub version: u64,
    pub applied_at: DateTime<Utc>,
    pub ops: Vec<DeltaOp>,
}

#[derive(Serialize, Deserialize)]
struct RecordPayload {
    applied_at: DateTime<Utc>,
    ops: Vec<DeltaOp>,
}

impl ChangeLogRecord {
    pub fn new(version: u64, ops: Vec<DeltaOp>) -> Self {
        Self {
            version,
            applied_at: Utc::now(),
            ops,
        }
    }

    /// Encodes the record as one frame.
    pub fn encode(&self) -> ChangeLogResult<Vec<u8>> {
        let payload = serde_json::to_vec(&RecordPayload {
            applied_at: self.applied_at,
            ops: self.ops.clone(),
        })?;
        let version_bytes = self.version.to_le_bytes();
        let frame_len = (version_bytes.len() + payload.len()) as u32;
        let checksum = compute_checksum(&[&version_bytes[..], payload.as_slice()]);

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
        buf.extend_from_slice(&frame_len.to_le_bytes());
        buf.extend_from_slice(&version_bytes);
        buf.extend_from_slice(&payload);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }

    /// Decodes the frame body (version + payload) after its checksum is checked.
    ///
    /// `offset` is only used for error reporting.
    pub fn decode(body: &[u8], checksum: u32, offset: u64) -> ChangeLogResult<Self> {
        if body.len() < 8 {
            return Err(ChangeLogError::corruption(offset, "frame shorter than version"));
        }
        let (version_bytes, payload) = body.split_at(8);
        if !verify_checksum(&[version_bytes, payload], checksum) {
            return Err(ChangeLogError::corruption(offset, "checksum mismatch"));
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(version_bytes);
        let version = u64::from_le_bytes(raw);
        let decoded: RecordPayload = serde_json::from_slice(payload)
            .map_err(|e| ChangeLogError::corruption(offset, format!("bad payload: {}", e)))?;
        Ok(Self {
            version,
            applied_at: decoded.applied_at,
            ops: decoded.ops,
        })
    }
}
