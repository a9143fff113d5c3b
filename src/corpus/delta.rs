//! Delta and change event types
//!
//! A `Delta` is an ordered list of add/update/remove operations that moves
//! the corpus from version v to v+1, all or nothing. Each operation that
//! actually changes the corpus produces exactly one `ChangeEvent`.

use serde::{Deserialize, Serialize};

use super::version::CorpusVersion;
use crate::scheme::{ContentHash, Scheme};

/// One corpus mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DeltaOp {
    Add {
        scheme: Scheme,
    },
    Update {
        scheme: Scheme,
    },
    Remove {
        #[serde(rename = "schemeId")]
        scheme_id: String,
        /// Hash of the record being removed, when the producer knows it.
        #[serde(
            rename = "contentHash",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        content_hash: Option<ContentHash>,
    },
}

impl DeltaOp {
    pub fn scheme_id(&self) -> &str {
        match self {
            DeltaOp::Add { scheme } | DeltaOp::Update { scheme } => scheme.id(),
            DeltaOp::Remove { scheme_id, .. } => scheme_id,
        }
    }

    /// The payload for add/update operations.
    pub fn scheme(&self) -> Option<&Scheme> {
        match self {
            DeltaOp::Add { scheme } | DeltaOp::Update { scheme } => Some(scheme),
            DeltaOp::Remove { .. } => None,
        }
    }
}

/// An ordered list of operations applied atomically.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Delta {
    pub ops: Vec<DeltaOp>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, scheme: Scheme) -> Self {
        self.ops.push(DeltaOp::Add { scheme });
        self
    }

    pub fn update(mut self, scheme: Scheme) -> Self {
        self.ops.push(DeltaOp::Update { scheme });
        self
    }

    pub fn remove(mut self, scheme_id: impl Into<String>) -> Self {
        self.ops.push(DeltaOp::Remove {
            scheme_id: scheme_id.into(),
            content_hash: None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// What happened to a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

/// Emitted once per effective delta operation, in version order.
///
/// The corpus never retries delivery; consumers own durability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub scheme_id: String,
    pub kind: ChangeKind,
    /// Category of the scheme (the previous category for removals).
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<ContentHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<ContentHash>,
    pub version: CorpusVersion,
}

/// Outcome of a successful `apply_delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDelta {
    /// Version after the apply. Equal to the prior version when nothing changed.
    pub version: CorpusVersion,
    pub events: Vec<ChangeEvent>,
}

impl AppliedDelta {
    /// True when the delta changed nothing (already applied).
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }
}
