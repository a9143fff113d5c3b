//! Remote scheme authority seam
//!
//! Transport is the implementor's concern. The engine only needs a manifest
//! of (id, hash) pairs and full records on demand.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::RemoteError;
use crate::corpus::CorpusVersion;
use crate::scheme::{ContentHash, Scheme};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub scheme_id: String,
    pub content_hash: ContentHash,
}

/// Complete listing of the authority's records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// The authority's own revision marker, informational only.
    #[serde(default)]
    pub remote_version: u64,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self {
            remote_version: 0,
            entries,
        }
    }

    /// Builds a manifest listing `schemes` with their current hashes.
    pub fn describing<'a, I>(schemes: I) -> Self
    where
        I: IntoIterator<Item = &'a Scheme>,
    {
        Self::new(
            schemes
                .into_iter()
                .map(|s| ManifestEntry {
                    scheme_id: s.id().to_string(),
                    content_hash: s.content_hash(),
                })
                .collect(),
        )
    }

    /// First id listed more than once, if any.
    pub fn duplicate_id(&self) -> Option<&str> {
        let mut seen = BTreeSet::new();
        self.entries
            .iter()
            .map(|e| e.scheme_id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

/// The authoritative source of scheme records.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Lists every record. `since` is the caller's corpus version, a hint
    /// the authority may use; the listing must still be complete.
    async fn fetch_manifest(&self, since: CorpusVersion) -> Result<Manifest, RemoteError>;

    async fn fetch_record(&self, scheme_id: &str) -> Result<Scheme, RemoteError>;
}
