//! Record-by-record reconciliation checkpoint
//!
//! Holds every payload fetched and verified during the current cycle. A
//! confirmed payload is reused on resume only while its hash still equals
//! the manifest's, so a checkpoint can never smuggle in a record the
//! authority no longer lists. Cleared once the delta is applied.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{SyncError, SyncResult};
use super::remote::ManifestEntry;
use crate::scheme::Scheme;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCheckpoint {
    pub remote_version: u64,
    pub confirmed: BTreeMap<String, Scheme>,
}

impl SyncCheckpoint {
    /// The confirmed payload for `entry`, if its hash still matches.
    pub fn confirmed_for(&self, entry: &ManifestEntry) -> Option<&Scheme> {
        self.confirmed
            .get(&entry.scheme_id)
            .filter(|s| s.content_hash() == entry.content_hash)
    }

    pub fn confirm(&mut self, scheme: Scheme) {
        self.confirmed.insert(scheme.id().to_string(), scheme);
    }

    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }
}

/// Optional on-disk home for the checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint; a missing file is an empty checkpoint.
    pub fn load(&self) -> SyncResult<SyncCheckpoint> {
        if !self.path.exists() {
            return Ok(SyncCheckpoint::default());
        }
        let bytes = fs::read(&self.path)
            .map_err(|e| SyncError::checkpoint(format!("read {}", self.path.display()), e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::checkpoint(format!("parse {}", self.path.display()), e))
    }

    /// Writes the checkpoint atomically.
    pub fn save(&self, checkpoint: &SyncCheckpoint) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SyncError::checkpoint(format!("create {}", parent.display()), e))?;
        }
        let bytes = serde_json::to_vec(checkpoint)
            .map_err(|e| SyncError::checkpoint("encode", e))?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)
                .map_err(|e| SyncError::checkpoint(format!("create {}", tmp.display()), e))?;
            file.write_all(&bytes)
                .and_then(|_| file.sync_all())
                .map_err(|e| SyncError::checkpoint(format!("write {}", tmp.display()), e))?;
        }
        fs::rename(&tmp, &self.path)
            .map_err(|e| SyncError::checkpoint(format!("install {}", self.path.display()), e))
    }

    pub fn clear(&self) -> SyncResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::checkpoint(
                format!("remove {}", self.path.display()),
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{SchemeContent, SchemeLevel};
    use tempfile::TempDir;

    fn scheme(benefits: &str) -> Scheme {
        Scheme::new(
            "S1",
            SchemeContent::new("pension", SchemeLevel::Central).with_benefits(benefits),
        )
    }

    #[test]
    fn test_confirmed_only_while_hash_matches() {
        let mut cp = SyncCheckpoint::default();
        cp.confirm(scheme("old"));
        let entry = ManifestEntry {
            scheme_id: "S1".into(),
            content_hash: scheme("old").content_hash(),
        };
        assert!(cp.confirmed_for(&entry).is_some());
        let moved = ManifestEntry {
            scheme_id: "S1".into(),
            content_hash: scheme("new").content_hash(),
        };
        assert!(cp.confirmed_for(&moved).is_none());
    }

    #[test]
    fn test_file_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let file = CheckpointFile::new(tmp.path().join("sync").join("checkpoint.json"));
        assert!(file.load().unwrap().is_empty());

        let mut cp = SyncCheckpoint::default();
        cp.confirm(scheme("x"));
        file.save(&cp).unwrap();
        assert_eq!(file.load().unwrap(), cp);

        file.clear().unwrap();
        assert!(file.load().unwrap().is_empty());
        file.clear().unwrap();
    }
}
