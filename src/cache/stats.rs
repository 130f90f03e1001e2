//! Cache Statistics Module
//!
//! Tracks performance metrics across both tiers. Metrics are exposed
//! read-only and never feed back into cache behavior.

use serde::Serialize;

// == Cache Stats ==
/// Counters for the two-tier cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the memory tier
    pub memory_hits: u64,
    /// Lookups answered from the durable tier (and promoted)
    pub durable_hits: u64,
    /// Lookups absent or expired in both tiers
    pub misses: u64,
    /// Entries evicted from the memory tier by the FIFO policy
    pub evictions: u64,
    /// Total `get` calls served
    pub total_requests: u64,
    /// Current memory-tier entry count
    pub memory_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Combined hit rate over both tiers; 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.memory_hits + self.durable_hits) as f64 / self.total_requests as f64
        }
    }

    // == Memory Hit Rate ==
    /// Fraction of all requests answered by the memory tier alone.
    pub fn memory_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.memory_hits as f64 / self.total_requests as f64
        }
    }

    // == Recorders ==
    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
        self.total_requests += 1;
    }

    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
        self.total_requests += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.total_requests += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn set_memory_entries(&mut self, count: usize) {
        self.memory_entries = count;
    }
}
