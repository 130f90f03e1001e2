//! Response Models
//!
//! JSON response bodies for the operational HTTP surface.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::prefetch::SchedulerStats;

// == Stats Response ==
/// Read-only metrics snapshot for dashboards.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub memory_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_requests: u64,
    pub memory_entries: usize,
    pub hit_rate: f64,
    pub memory_hit_rate: f64,
    pub prefetch: SchedulerStats,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, prefetch: SchedulerStats) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            memory_hit_rate: cache.memory_hit_rate(),
            memory_hits: cache.memory_hits,
            durable_hits: cache.durable_hits,
            misses: cache.misses,
            evictions: cache.evictions,
            total_requests: cache.total_requests,
            memory_entries: cache.memory_entries,
            prefetch,
        }
    }
}

// == Sweep Response ==
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub removed: u64,
}

// == Clear Response ==
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Category that was cleared, or "all"
    pub category: String,
    pub removed: u64,
}

// == Health Response ==
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
