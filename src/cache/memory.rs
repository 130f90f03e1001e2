//! Memory Tier Module
//!
//! Bounded in-memory tier with strict FIFO eviction over insertion order.
//!
//! Eviction deliberately ignores access recency: when the tier is full,
//! the oldest-inserted entry goes, keeping whatever was most recently
//! written. Exactly one entry is evicted per insertion over capacity.

use std::collections::{HashMap, VecDeque};

use crate::cache::{CacheEntry, Category};

// == Memory Tier ==
/// Fast volatile tier backed by a HashMap plus an insertion-order queue.
#[derive(Debug)]
pub struct MemoryTier {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Insertion order: front = oldest, back = newest
    order: VecDeque<String>,
    /// Maximum number of entries
    capacity: usize,
}

impl MemoryTier {
    // == Constructor ==
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    // == Insert ==
    /// Inserts an entry, returning the evicted entry if the tier was full.
    ///
    /// Overwriting an existing key counts as a fresh insertion: the key
    /// moves to the back of the eviction order and nothing is evicted.
    ///
    /// Capacity 0 disables the tier: inserts store nothing.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        if self.capacity == 0 {
            return None;
        }

        let key = entry.key.clone();
        let is_overwrite = self.entries.contains_key(&key);

        let mut evicted = None;
        if !is_overwrite && self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                evicted = self.entries.remove(&oldest);
            }
        }

        if is_overwrite {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, entry);

        evicted
    }

    // == Get ==
    /// Returns the entry for a key, expired or not. Freshness is the
    /// store's concern; the tier only tracks presence.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Remove ==
    /// Removes a key. Idempotent; removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    // == Remove Expired ==
    /// Drops every expired entry, returning how many were removed.
    pub fn remove_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    // == Clear Category ==
    /// Drops every entry of a category, returning how many were removed.
    pub fn clear_category(&mut self, category: Category) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.category == category)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            self.remove(key);
        }
        keys.len()
    }

    // == Clear ==
    /// Drops everything, returning how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured maximum entry count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
