//! Cache Store Module
//!
//! Two-tier cache engine: a bounded volatile memory tier in front of the
//! durable SQLite tier, with write-through sets, promotion on durable
//! hits, and per-category TTLs.
//!
//! Durable-tier failures are logged and swallowed everywhere; the memory
//! tier is authoritative for the current process.

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, Category, DurableTier, MemoryTier, TtlTable};
use crate::error::StorageError;

// == Cache Store ==
/// Two-tier store. Shared across callers behind an `Arc`; all interior
/// state is lock-protected and locks are never held across durable I/O.
#[derive(Debug)]
pub struct CacheStore {
    /// Fast volatile tier
    memory: RwLock<MemoryTier>,
    /// Persistent tier
    durable: DurableTier,
    /// Per-category TTLs, fixed at construction
    ttls: TtlTable,
    /// Performance counters
    stats: RwLock<CacheStats>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store over an already-opened durable tier.
    pub fn new(durable: DurableTier, memory_capacity: usize, ttls: TtlTable) -> Self {
        Self {
            memory: RwLock::new(MemoryTier::new(memory_capacity)),
            durable,
            ttls,
            stats: RwLock::new(CacheStats::new()),
        }
    }

    // == Get ==
    /// Looks a key up: memory tier first, then durable with promotion.
    ///
    /// A miss returns `None`, never an error. Expired entries are treated
    /// as absent; an expired durable row is deleted as a side effect.
    pub async fn get(&self, key: &str) -> Option<Value> {
        // Memory tier
        {
            let mut memory = self.memory.write().await;
            if let Some(entry) = memory.get(key) {
                if !entry.is_expired() {
                    let payload = entry.payload.clone();
                    self.stats.write().await.record_memory_hit();
                    return Some(payload);
                }
                memory.remove(key);
            }
        }

        // Durable tier
        match self.durable.get(key).await {
            Ok(Some(entry)) if !entry.is_expired() => {
                // Promote so the next lookup is fast
                {
                    let mut memory = self.memory.write().await;
                    if memory.insert(entry.clone()).is_some() {
                        self.stats.write().await.record_eviction();
                    }
                }
                self.stats.write().await.record_durable_hit();
                Some(entry.payload)
            }
            Ok(Some(entry)) => {
                debug!(key, "durable entry expired, deleting");
                if let Err(e) = self.durable.delete(&entry.key).await {
                    warn!(key, error = %e, "failed to delete expired durable entry");
                }
                self.stats.write().await.record_miss();
                None
            }
            Ok(None) => {
                self.stats.write().await.record_miss();
                None
            }
            Err(e) => {
                warn!(key, error = %e, "durable tier read failed");
                self.stats.write().await.record_miss();
                None
            }
        }
    }

    // == Is Warm ==
    /// Whether a valid entry exists in either tier. Does not count toward
    /// request metrics and does not promote; used by the prefetch
    /// scheduler to skip already-warm keys.
    pub async fn is_warm(&self, key: &str) -> bool {
        {
            let memory = self.memory.read().await;
            if let Some(entry) = memory.get(key) {
                if !entry.is_expired() {
                    return true;
                }
            }
        }

        match self.durable.get(key).await {
            Ok(Some(entry)) => !entry.is_expired(),
            Ok(None) => false,
            Err(e) => {
                warn!(key, error = %e, "durable tier read failed");
                false
            }
        }
    }

    // == Set ==
    /// Writes through both tiers with the category's configured TTL,
    /// computed from the current time. Durable-write failure is logged
    /// and does not fail the call.
    pub async fn set(&self, key: &str, payload: Value, category: Category) {
        let entry = CacheEntry::new(
            key.to_string(),
            category,
            payload,
            self.ttls.ttl_for(category),
        );

        {
            let mut memory = self.memory.write().await;
            let evicted = memory.insert(entry.clone());
            let mut stats = self.stats.write().await;
            if evicted.is_some() {
                stats.record_eviction();
            }
            stats.set_memory_entries(memory.len());
        }

        if let Err(e) = self.durable.put(&entry).await {
            warn!(key, error = %e, "durable tier write failed, entry is memory-only");
        }
    }

    // == Remove ==
    /// Removes a key from both tiers. Idempotent.
    pub async fn remove(&self, key: &str) {
        self.memory.write().await.remove(key);
        if let Err(e) = self.durable.delete(key).await {
            warn!(key, error = %e, "durable tier delete failed");
        }
    }

    // == Clear Category ==
    /// Removes every entry of a category from both tiers; returns the
    /// durable-tier removal count. Idempotent.
    pub async fn clear_category(&self, category: Category) -> u64 {
        let memory_removed = self.memory.write().await.clear_category(category);
        let durable_removed = match self.durable.clear_category(category).await {
            Ok(count) => count,
            Err(e) => {
                warn!(%category, error = %e, "durable tier category clear failed");
                0
            }
        };
        debug!(%category, memory_removed, durable_removed, "category cleared");
        durable_removed.max(memory_removed as u64)
    }

    // == Clear All ==
    /// Empties both tiers; returns the larger tier's removal count.
    pub async fn clear_all(&self) -> u64 {
        let memory_removed = self.memory.write().await.clear();
        let durable_removed = match self.durable.clear_all().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "durable tier clear failed");
                0
            }
        };
        durable_removed.max(memory_removed as u64)
    }

    // == Sweep Expired ==
    /// Deletes expired entries from both tiers; returns the total removed.
    /// Safe to run concurrently with reads; one pass need not be exhaustive.
    pub async fn sweep_expired(&self) -> u64 {
        let memory_removed = self.memory.write().await.remove_expired() as u64;
        let durable_removed = match self.durable.delete_expired().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "durable tier sweep failed");
                0
            }
        };
        memory_removed + durable_removed
    }

    // == Stats ==
    /// Read-only metrics snapshot.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.set_memory_entries(self.memory.read().await.len());
        stats
    }

    /// Configured memory-tier capacity.
    pub async fn memory_capacity(&self) -> usize {
        self.memory.read().await.capacity()
    }

    /// Direct durable-tier access for maintenance surfaces.
    #[allow(dead_code)]
    pub(crate) async fn durable_count(&self) -> Result<u64, StorageError> {
        self.durable.count().await
    }
}
