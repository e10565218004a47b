//! # Conditional GET
//!
//! Record content is fingerprinted with SHA-256 and served with a strong
//! `ETag`. `If-None-Match` is honored for record lookups only.

use sha2::{Digest, Sha256};

/// Fetched record content plus its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentResult {
    pub bytes: Vec<u8>,
    pub fingerprint: String,
}

impl ContentResult {
    pub fn new(bytes: Vec<u8>) -> Self {
        let fingerprint = fingerprint(&bytes);
        Self { bytes, fingerprint }
    }

    /// Whether a client holding `if_none_match` already has this content
    pub fn is_not_modified(&self, if_none_match: Option<&str>) -> bool {
        if_none_match.map_or(false, |header| matches(header, &self.fingerprint))
    }
}

/// Quoted lowercase hex SHA-256 of the exact bytes
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("\"{:x}\"", hasher.finalize())
}

/// `If-None-Match` matching: empty never matches, `*` always matches,
/// otherwise any comma-separated entry equal to the fingerprint matches.
pub fn matches(header: &str, fingerprint: &str) -> bool {
    let header = header.trim();
    if header.is_empty() {
        return false;
    }
    if header == "*" {
        return true;
    }
    header.split(',').any(|tag| tag.trim() == fingerprint)
}
