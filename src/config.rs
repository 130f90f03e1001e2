//! Configuration Module
//!
//! Handles loading and managing service configuration from environment
//! variables. The category TTL table is part of the configuration and is
//! fixed for the life of the process.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::TtlTable;
use crate::prefetch::SchedulerConfig;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries in the memory tier
    pub memory_capacity: usize,
    /// Durable-tier database path; `None` keeps everything in memory
    pub db_path: Option<PathBuf>,
    /// Per-category TTLs
    pub ttls: TtlTable,
    /// Prefetch scheduler tunables
    pub scheduler: SchedulerConfig,
    /// Optional JSON file overriding the built-in seed/relation tables
    pub seeds_path: Option<PathBuf>,
    /// Interval between expired-entry sweeps, in seconds
    pub sweep_interval: u64,
    /// HTTP port for the operational surface
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_CAPACITY` - Memory-tier entry limit (default: 500)
    /// - `DB_PATH` - SQLite file path (default: clinref_cache.db; empty = in-memory)
    /// - `SEEDS_PATH` - JSON seeds/relations file (default: built-in tables)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PATTERN_WINDOW` - Analysis window size (default: 10)
    /// - `REPEAT_THRESHOLD` - Repetitions that trigger expansion (default: 2)
    /// - `MAX_CONCURRENT` - Prefetch worker count (default: 2)
    /// - `RETRY_LIMIT` - Prefetch retries before dropping (default: 3)
    /// - `FETCH_DELAY_MS` - Pause after each prefetch fetch (default: 500)
    pub fn from_env() -> Self {
        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            window: parse_env("PATTERN_WINDOW").unwrap_or(defaults.window),
            repeat_threshold: parse_env("REPEAT_THRESHOLD").unwrap_or(defaults.repeat_threshold),
            max_concurrent: parse_env("MAX_CONCURRENT").unwrap_or(defaults.max_concurrent),
            retry_limit: parse_env("RETRY_LIMIT").unwrap_or(defaults.retry_limit),
            fetch_delay: parse_env("FETCH_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_delay),
            pattern_capacity: defaults.pattern_capacity,
        };

        let db_path = match env::var("DB_PATH") {
            Ok(path) if path.is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => Some(PathBuf::from("clinref_cache.db")),
        };

        Self {
            memory_capacity: parse_env("MEMORY_CAPACITY").unwrap_or(500),
            db_path,
            ttls: TtlTable::default(),
            scheduler,
            seeds_path: env::var("SEEDS_PATH").ok().map(PathBuf::from),
            sweep_interval: parse_env("SWEEP_INTERVAL").unwrap_or(300),
            server_port: parse_env("SERVER_PORT").unwrap_or(3000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_capacity: 500,
            db_path: Some(PathBuf::from("clinref_cache.db")),
            ttls: TtlTable::default(),
            scheduler: SchedulerConfig::default(),
            seeds_path: None,
            sweep_interval: 300,
            server_port: 3000,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
