//! Cache Gateway Module
//!
//! The single entry point callers use: get-or-fetch semantics over the
//! two-tier store, with in-process request coalescing and pattern
//! recording for the prefetch scheduler.
//!
//! Coalescing contract: while a fetch for key K is in flight, later
//! callers for K do not issue a second fetch; they wait on the in-flight
//! one and receive the same result. The leader broadcasts its outcome,
//! success or failure, to every waiter.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::cache::{cache_key, CacheStore, Category};
use crate::error::FetchError;
use crate::prefetch::{PrefetchScheduler, SearchPattern};

// == Call Options ==
/// Per-call knobs for `cached_call`.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    /// Skip the cache read and always fetch
    pub force_refresh: bool,
    /// Record a search pattern for the prefetch scheduler
    pub record_pattern: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            record_pattern: true,
        }
    }
}

enum Role {
    Leader(broadcast::Sender<Result<Value, FetchError>>),
    Follower(broadcast::Receiver<Result<Value, FetchError>>),
}

/// Clears a key's in-flight slot when the leader finishes or is dropped.
///
/// The leader's fetch can be abandoned mid-await (a caller-side timeout
/// drops the `cached_call` future). Removing the entry here drops the
/// map's sender, so followers observe a closed channel instead of
/// waiting forever, and the next caller becomes a fresh leader.
struct InFlightGuard<'a> {
    gateway: &'a CacheGateway,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gateway.in_flight().remove(self.key);
    }
}

// == Cache Gateway ==
pub struct CacheGateway {
    store: Arc<CacheStore>,
    scheduler: Option<Arc<PrefetchScheduler>>,
    /// One broadcast channel per in-flight key. Guarded by a std mutex,
    /// never held across an await.
    in_flight: Mutex<HashMap<String, broadcast::Sender<Result<Value, FetchError>>>>,
}

impl CacheGateway {
    // == Constructor ==
    /// A gateway without prefetch wiring; lookups are cached but no
    /// patterns are recorded anywhere.
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            scheduler: None,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// A gateway that feeds every observation to the prefetch scheduler.
    pub fn with_scheduler(store: Arc<CacheStore>, scheduler: Arc<PrefetchScheduler>) -> Self {
        Self {
            store,
            scheduler: Some(scheduler),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn in_flight(
        &self,
    ) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Result<Value, FetchError>>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Cached Call ==
    /// Get-or-fetch for a query.
    ///
    /// On a hit the fetch function is never invoked. On a miss (or
    /// `force_refresh`) exactly one fetch runs per key across concurrent
    /// duplicate callers. A successful fetch is written through the store;
    /// a failed fetch is propagated unchanged, caches nothing, and records
    /// no pattern.
    pub async fn cached_call<F, Fut>(
        &self,
        query: &str,
        category: Category,
        fetch: F,
        options: CallOptions,
    ) -> Result<Value, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, FetchError>>,
    {
        let key = cache_key(category, query);

        if !options.force_refresh {
            if let Some(value) = self.store.get(&key).await {
                debug!(%key, "cache hit");
                if options.record_pattern {
                    self.record_pattern(query, category, &value);
                }
                return Ok(value);
            }
        }

        let role = {
            let mut in_flight = self.in_flight();
            match in_flight.get(&key) {
                Some(sender) => Role::Follower(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    in_flight.insert(key.clone(), sender.clone());
                    Role::Leader(sender)
                }
            }
        };

        match role {
            Role::Follower(mut receiver) => {
                debug!(%key, "joining in-flight fetch");
                match receiver.recv().await {
                    Ok(result) => result,
                    // Leader dropped without broadcasting
                    Err(_) => Err(FetchError::Upstream(format!(
                        "in-flight fetch for '{}' was abandoned",
                        key
                    ))),
                }
            }
            Role::Leader(sender) => {
                debug!(%key, "cache miss, fetching");
                let slot = InFlightGuard {
                    gateway: self,
                    key: &key,
                };
                let result = fetch().await;

                if let Ok(value) = &result {
                    self.store.set(&key, value.clone(), category).await;
                    if options.record_pattern {
                        self.record_pattern(query, category, value);
                    }
                }

                // Free the key before broadcasting so a caller arriving
                // after the send starts a fresh fetch
                drop(slot);
                let _ = sender.send(result.clone());
                result
            }
        }
    }

    // == Pattern Recording ==
    /// Result size is the element count for sequences, 1 for scalars.
    fn record_pattern(&self, query: &str, category: Category, value: &Value) {
        if let Some(scheduler) = &self.scheduler {
            let result_count = value.as_array().map(|a| a.len()).unwrap_or(1);
            scheduler.observe(SearchPattern::new(query, category, result_count));
        }
    }

    /// The store this gateway fronts.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }
}

impl std::fmt::Debug for CacheGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheGateway")
            .field("prefetch_wired", &self.scheduler.is_some())
            .finish()
    }
}
