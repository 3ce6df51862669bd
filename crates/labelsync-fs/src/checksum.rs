//! SHA-256 digest utilities
//!
//! Rule keys for expression-based checks embed a short prefix of the
//! digest of the expression, so the digest must be stable across runs and
//! platforms.

use sha2::{Digest, Sha256};

/// Compute the full lowercase hex SHA-256 digest of string content.
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compute the first `len` hex characters of the SHA-256 digest.
///
/// `len` is clamped to the full digest length (64).
pub fn short_digest(content: &str, len: usize) -> String {
    let mut digest = content_digest(content);
    digest.truncate(len.min(digest.len()));
    digest
}
