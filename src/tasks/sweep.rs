//! Expired-Entry Sweep Task
//!
//! Background task that periodically deletes expired entries from both
//! cache tiers. The sweep is advisory housekeeping: reads already treat
//! expired entries as absent, sweeping just reclaims the space.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a task that sweeps expired entries at a fixed interval.
///
/// Returns a JoinHandle used to abort the task during shutdown.
pub fn spawn_sweep_task(store: Arc<CacheStore>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "expired-entry sweep task started");

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.sweep_expired().await;
            if removed > 0 {
                info!(removed, "sweep removed expired entries");
            } else {
                debug!("sweep found no expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Category, DurableTier, TtlTable};
    use serde_json::json;

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let durable = DurableTier::open_in_memory().await.unwrap();
        let ttls = TtlTable::with_overrides(&[(Category::General, Duration::from_millis(10))]);
        let store = Arc::new(CacheStore::new(durable, 100, ttls));

        store.set("general:soon-stale", json!("x"), Category::General).await;

        let handle = spawn_sweep_task(Arc::clone(&store), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(store.durable_count().await.unwrap() == 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let durable = DurableTier::open_in_memory().await.unwrap();
        let store = Arc::new(CacheStore::new(durable, 100, TtlTable::default()));

        store.set("codes:i10", json!("x"), Category::Codes).await;

        let handle = spawn_sweep_task(Arc::clone(&store), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(store.get("codes:i10").await.is_some());
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let durable = DurableTier::open_in_memory().await.unwrap();
        let store = Arc::new(CacheStore::new(durable, 100, TtlTable::default()));

        let handle = spawn_sweep_task(store, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
