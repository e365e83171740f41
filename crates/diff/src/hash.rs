//! Byte-hash comparison for static creative images.
//!
//! Creatives have no meaningful spatial decomposition, so comparison is a
//! binary signal: the SHA-256 digests of the raw bytes either match or
//! they do not.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Whether two byte buffers have different content hashes.
pub fn bytes_changed(prev: &[u8], curr: &[u8]) -> bool {
    sha256_hex(prev) != sha256_hex(curr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn identical_bytes_are_unchanged() {
        let data = b"creative bytes";
        assert!(!bytes_changed(data, data));
    }

    #[test]
    fn different_bytes_are_changed() {
        assert!(bytes_changed(b"v1", b"v2"));
    }
}
