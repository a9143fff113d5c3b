//! Versioned record table
//!
//! `records.json` holds the full corpus at one version: a single monotonic
//! version counter and, per scheme id, the record plus the content hash it
//! had when written. The table is rewritten atomically (temp file, fsync,
//! rename) after each apply; the change log covers any versions the table
//! has not caught up with.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{ChangeLogError, ChangeLogResult};
use crate::scheme::{ContentHash, Scheme};

/// One stored scheme with the hash recorded at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub content_hash: ContentHash,
    pub scheme: Scheme,
}

/// The persisted corpus at one version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordTable {
    pub version: u64,
    pub records: BTreeMap<String, StoredRecord>,
}

impl RecordTable {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            records: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, scheme: Scheme) {
        self.records.insert(
            scheme.id().to_string(),
            StoredRecord {
                content_hash: scheme.content_hash(),
                scheme,
            },
        );
    }

    /// Loads the table. A missing file is an empty table at version 0.
    pub fn load(path: &Path) -> ChangeLogResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).map_err(|e| {
            ChangeLogError::io(format!("Failed to read record table {}", path.display()), e)
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes the table atomically.
    pub fn write_atomic(&self, path: &Path) -> ChangeLogResult<()> {
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;
        {
            let mut file = File::create(&tmp_path).map_err(|e| {
                ChangeLogError::io(format!("Failed to create {}", tmp_path.display()), e)
            })?;
            file.write_all(&bytes)
                .map_err(|e| ChangeLogError::io("Failed to write record table", e))?;
            file.sync_all()
                .map_err(|e| ChangeLogError::io("Failed to fsync record table", e))?;
        }
        fs::rename(&tmp_path, path).map_err(|e| {
            ChangeLogError::io(format!("Failed to install record table {}", path.display()), e)
        })?;
        Ok(())
    }
}
