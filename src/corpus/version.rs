//! CorpusVersion - Totally ordered corpus version
//!
//! - Strictly increases on every successful delta application
//! - Never reused, never skipped
//! - Preserved across restarts through the change log
//! - Independent of wall-clock time

use std::fmt;

use serde::{Deserialize, Serialize};

/// A monotonically increasing corpus version number.
///
/// Version 0 is the empty corpus.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusVersion(u64);

impl CorpusVersion {
    /// The version of an empty, never-written corpus.
    pub const ZERO: CorpusVersion = CorpusVersion(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The version a successful apply on top of this one produces.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CorpusVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_strictly_greater() {
        let v = CorpusVersion::new(5);
        assert_eq!(v.next(), CorpusVersion::new(6));
        assert!(v.next() > v);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&CorpusVersion::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
