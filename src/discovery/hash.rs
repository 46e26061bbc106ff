//! Content hashing for change detection.
//!
//! Archived and live configurations are compared by SHA-256 digest so the
//! preview can flag items an apply would leave byte-for-byte unchanged.

use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Check whether content differs from another digest.
///
/// Returns `true` when there is nothing to compare against or the hashes differ.
#[must_use]
pub fn has_changed(current_hash: &str, other_hash: Option<&str>) -> bool {
    other_hash.is_none_or(|h| h != current_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let hash1 = content_hash(b"<project/>");
        let hash2 = content_hash(b"<project/>");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA256 produces 64 hex chars
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        assert_ne!(content_hash(b"<project/>"), content_hash(b"<project />"));
    }

    #[test]
    fn test_has_changed() {
        assert!(has_changed("abc123", None));
        assert!(has_changed("abc123", Some("xyz789")));
        assert!(!has_changed("abc123", Some("abc123")));
    }
}
