//! Cache Module
//!
//! Two-tier caching: a bounded in-memory tier with FIFO eviction in front
//! of a durable SQLite tier, with per-category TTL expiration.

mod category;
mod durable;
mod entry;
mod key;
mod memory;
mod stats;
mod store;


// Re-export public types
pub use category::{Category, TtlTable};
pub use durable::DurableTier;
pub use entry::CacheEntry;
pub use key::{cache_key, multi_id_key, normalize_query};
pub use memory::MemoryTier;
pub use stats::CacheStats;
pub use store::CacheStore;
