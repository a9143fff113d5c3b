//! CRC32 checksum computation for change log frames
//!
//! - Every frame carries a checksum
//! - The checksum covers the version and payload bytes
//! - Any mismatch is corruption

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over the given byte slices, in order.
pub fn compute_checksum(parts: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

/// Returns `true` if the checksum over `parts` equals `expected`.
pub fn verify_checksum(parts: &[&[u8]], expected: u32) -> bool {
    compute_checksum(parts) == expected
}
