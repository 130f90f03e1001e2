//! Clinref Cache - A multi-tier cache with predictive prefetch
//!
//! Fronts slow, rate-limited clinical reference lookups with a bounded
//! memory tier, a durable SQLite tier, request coalescing, and a
//! background scheduler that warms the cache from observed search
//! patterns.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod prefetch;
pub mod service;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStore, Category};
pub use config::Config;
pub use error::{CacheError, FetchError, StorageError};
pub use gateway::{CacheGateway, CallOptions};
pub use prefetch::{FetcherRegistry, PrefetchScheduler, PrefetchSeeds};
pub use service::CacheService;
pub use tasks::spawn_sweep_task;
