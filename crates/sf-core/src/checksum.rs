//! SHA-256 checksum utility for tamper detection.

use sha2::{Digest, Sha256};

/// Placeholder recorded for ledger rows written before checksums existed.
///
/// Rows carrying this value are exempt from drift checks.
pub const LEGACY_CHECKSUM: &str = "legacy_migration_no_checksum_available";

/// Compute the hex-encoded SHA-256 checksum of raw bytes
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Compute the checksum of a string's UTF-8 bytes
pub fn compute_checksum_str(s: &str) -> String {
    compute_checksum(s.as_bytes())
}

/// Whether a recorded checksum is the legacy sentinel
pub fn is_legacy(checksum: &str) -> bool {
    checksum == LEGACY_CHECKSUM
}

/// Shorten a checksum for log lines (first 16 hex characters)
pub fn short(checksum: &str) -> &str {
    checksum.get(..16).unwrap_or(checksum)
}

#[cfg(test)]
#[path = "checksum_test.rs"]
mod tests;
