//! Cache Key Module
//!
//! Deterministic key derivation: `"{category}:{normalized query}"`.
//!
//! Keys must be case- and call-shape-stable: identical logical queries
//! always produce an identical key, regardless of caller whitespace,
//! letter case, or identifier ordering.

use crate::cache::Category;

// == Query Normalization ==
/// Normalizes a free-text query: trim, lowercase, collapse inner whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

// == Cache Key ==
/// Derives the cache key for a single-query lookup.
pub fn cache_key(category: Category, query: &str) -> String {
    format!("{}:{}", category.as_str(), normalize_query(query))
}

/// Derives the cache key for a multi-identifier lookup.
///
/// Identifiers are normalized, sorted, and deduplicated so that
/// `["B12", "a01"]` and `["a01", "b12", "a01"]` map to the same key.
pub fn multi_id_key(category: Category, ids: &[&str]) -> String {
    let mut normalized: Vec<String> = ids.iter().map(|id| normalize_query(id)).collect();
    normalized.sort();
    normalized.dedup();
    format!("{}:{}", category.as_str(), normalized.join(","))
}
