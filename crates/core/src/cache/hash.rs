//! Search cache key generation.

use sha2::{Digest, Sha256};

/// Normalize a search query: trim, lowercase, collapse inner whitespace.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Compute the search cache key (fingerprint) for a query.
///
/// Queries that normalize to the same text share a fingerprint, which is
/// what keeps the search table at one row per logical query.
pub fn search_fingerprint(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hex::encode(hasher.finalize())
}
