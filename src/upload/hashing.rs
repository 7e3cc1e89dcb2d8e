//! SHA256 content digest for the upload session.
//!
//! The service expects the raw hash bytes as standard, padded base64.

use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;

/// Base64 SHA256 of archive bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calculate the SHA256 digest of in-memory bytes
pub fn content_digest(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();

    ContentDigest(base64::engine::general_purpose::STANDARD.encode(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // sha256("") in base64
        assert_eq!(
            content_digest(b"").as_str(),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_digest_is_padded_base64_of_32_bytes() {
        let digest = content_digest(b"test content");
        // 32 bytes -> 44 base64 chars ending in a single pad
        assert_eq!(digest.as_str().len(), 44);
        assert!(digest.as_str().ends_with('='));
    }

    #[test]
    fn test_same_content_same_digest() {
        assert_eq!(content_digest(b"zip bytes"), content_digest(b"zip bytes"));
    }

    #[test]
    fn test_single_byte_change() {
        assert_ne!(content_digest(b"zip bytes"), content_digest(b"zip bytez"));
    }
}
