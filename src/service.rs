//! Cache Service Module
//!
//! Explicitly constructed facade wiring the store, gateway, and prefetch
//! scheduler together with an `init` / `start` / `shutdown` lifecycle.
//! Nothing runs in the background until `start` is called, so fetch
//! functions are always registered before the first scheduled task.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheStore, DurableTier};
use crate::config::Config;
use crate::error::Result;
use crate::gateway::CacheGateway;
use crate::prefetch::{FetcherRegistry, PrefetchScheduler, PrefetchSeeds};
use crate::tasks::spawn_sweep_task;

// == Cache Service ==
/// An initialized caching subsystem. Tests and hosts construct their own
/// instances; there is no module-level singleton.
#[derive(Debug)]
pub struct CacheService {
    store: Arc<CacheStore>,
    gateway: Arc<CacheGateway>,
    scheduler: Arc<PrefetchScheduler>,
    sweep_interval: u64,
    sweep_handle: Option<JoinHandle<()>>,
}

impl CacheService {
    // == Init ==
    /// Opens the durable tier and wires the components together.
    /// `registry` must already contain every fetch function the host
    /// wants prefetch to use.
    pub async fn init(config: Config, registry: FetcherRegistry) -> Result<Self> {
        let durable = match &config.db_path {
            Some(path) => DurableTier::open(path).await?,
            None => DurableTier::open_in_memory().await?,
        };

        let store = Arc::new(CacheStore::new(
            durable,
            config.memory_capacity,
            config.ttls.clone(),
        ));

        let seeds = match &config.seeds_path {
            Some(path) => match PrefetchSeeds::from_file(path) {
                Ok(seeds) => seeds,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load seeds file, using built-in tables");
                    PrefetchSeeds::default()
                }
            },
            None => PrefetchSeeds::default(),
        };

        if registry.is_empty() {
            info!("no fetchers registered; prefetch tasks will be skipped");
        }

        let scheduler = PrefetchScheduler::new(
            Arc::clone(&store),
            registry,
            seeds,
            config.scheduler.clone(),
        );
        let gateway = Arc::new(CacheGateway::with_scheduler(
            Arc::clone(&store),
            Arc::clone(&scheduler),
        ));

        Ok(Self {
            store,
            gateway,
            scheduler,
            sweep_interval: config.sweep_interval,
            sweep_handle: None,
        })
    }

    // == Start ==
    /// Starts the prefetch worker pool (which enqueues the seed list)
    /// and the periodic expired-entry sweep.
    pub fn start(&mut self) {
        self.scheduler.start();
        if self.sweep_handle.is_none() {
            self.sweep_handle = Some(spawn_sweep_task(
                Arc::clone(&self.store),
                self.sweep_interval,
            ));
        }
        info!("cache service started");
    }

    // == Shutdown ==
    /// Stops background work. The durable tier keeps whatever has been
    /// written; in-flight prefetches are abandoned.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
        }
        info!("cache service stopped");
    }

    // == Accessors ==
    pub fn gateway(&self) -> &Arc<CacheGateway> {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<PrefetchScheduler> {
        &self.scheduler
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
