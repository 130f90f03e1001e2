//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::Category;

// == Cache Entry ==
/// A single cached lookup result with its freshness metadata.
///
/// Callers receive payload clones and must treat them as read-only
/// snapshots; the store owns the entry itself.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Derived cache key (`"{category}:{normalized query}"`)
    pub key: String,
    /// Category the entry was stored under
    pub category: Category,
    /// Opaque lookup result
    pub payload: Value,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
    /// When the entry stops being valid
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry expiring `ttl` after the current time.
    pub fn new(key: String, category: Category, payload: Value, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Self {
            key,
            category,
            payload,
            stored_at: now,
            expires_at: now + ttl,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches `expires_at`.
    /// Expired entries are logically absent even while physically stored.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining validity window; zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}
