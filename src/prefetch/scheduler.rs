//! Prefetch Scheduler Module
//!
//! Turns observed query patterns and the startup seed list into prioritized
//! background fetch tasks, executed by a bounded worker pool with retry.
//!
//! Analysis runs synchronously after every recorded pattern: queries
//! repeated within the recent window are expanded through the relation
//! table into LOW-priority tasks. Workers pop from the shared queue, skip
//! keys that are already warm, and pace external calls with a fixed delay.
//!
//! Everything here is advisory. A prefetch failing never raises past its
//! own task boundary.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, CacheStore, Category};
use crate::error::FetchError;
use crate::prefetch::{CrawlTask, PatternLog, PrefetchSeeds, SearchPattern, TaskPriority, TaskQueue, TaskStatus};

// == Fetch Function ==
/// Boxed future returned by a registered fetch function.
pub type BoxedFetchFuture = Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send>>;

/// A pluggable external lookup: `(query) -> payload` or `FetchError`.
/// The function owns its own network-level timeout and retry policy.
pub type FetchFn = Arc<dyn Fn(String) -> BoxedFetchFuture + Send + Sync>;

// == Fetcher Registry ==
/// Static table mapping each category to its fetch function, assembled
/// once at startup before the scheduler starts.
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: HashMap<Category, FetchFn>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fetch function for a category, replacing any previous one.
    pub fn register<F, Fut>(&mut self, category: Category, fetch: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
    {
        self.fetchers
            .insert(category, Arc::new(move |query| Box::pin(fetch(query))));
    }

    pub fn get(&self, category: Category) -> Option<FetchFn> {
        self.fetchers.get(&category).cloned()
    }

    pub fn is_registered(&self, category: Category) -> bool {
        self.fetchers.contains_key(&category)
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl std::fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherRegistry")
            .field("categories", &self.fetchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// == Scheduler Config ==
/// Tunables for pattern analysis and the worker pool. The defaults are
/// conservative; only the shape of the algorithm is contractual.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How many recent patterns the analysis window spans
    pub window: usize,
    /// Repetitions within the window that trigger relation expansion
    pub repeat_threshold: usize,
    /// Maximum concurrent background fetches
    pub max_concurrent: usize,
    /// Retries before a task is dropped
    pub retry_limit: u32,
    /// Pause after each external fetch, to avoid bursting the upstream
    pub fetch_delay: Duration,
    /// Capacity of the pattern ring
    pub pattern_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window: 10,
            repeat_threshold: 2,
            max_concurrent: 2,
            retry_limit: 3,
            fetch_delay: Duration::from_millis(500),
            pattern_capacity: 100,
        }
    }
}

// == Scheduler Stats ==
/// Read-only snapshot of scheduler activity.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub queue_depth: usize,
    pub patterns_recorded: usize,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_skipped: u64,
}

// State behind one lock so pattern recording and queue manipulation stay
// atomic. Never held across an await.
#[derive(Debug)]
struct SchedulerState {
    log: PatternLog,
    queue: TaskQueue,
}

// == Prefetch Scheduler ==
pub struct PrefetchScheduler {
    store: Arc<CacheStore>,
    registry: FetcherRegistry,
    seeds: PrefetchSeeds,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    notify: Notify,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_skipped: AtomicU64,
}

impl PrefetchScheduler {
    // == Constructor ==
    /// Builds a scheduler; no tasks run until `start` is called, after
    /// all fetch functions have been registered.
    pub fn new(
        store: Arc<CacheStore>,
        registry: FetcherRegistry,
        seeds: PrefetchSeeds,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            store,
            registry,
            seeds,
            state: Mutex::new(SchedulerState {
                log: PatternLog::new(config.pattern_capacity),
                queue: TaskQueue::new(),
            }),
            config,
            notify: Notify::new(),
            shutdown,
            workers: Mutex::new(Vec::new()),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_skipped: AtomicU64::new(0),
        })
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Start ==
    /// Enqueues the seed list and spawns the worker pool.
    pub fn start(self: &Arc<Self>) {
        self.enqueue_seeds();

        let mut workers = self.workers.lock().unwrap_or_else(|p| p.into_inner());
        for worker_id in 0..self.config.max_concurrent {
            let scheduler = Arc::clone(self);
            workers.push(tokio::spawn(async move {
                scheduler.worker_loop(worker_id).await;
            }));
        }
        info!(
            workers = self.config.max_concurrent,
            queued = self.queue_depth(),
            "prefetch scheduler started"
        );
    }

    // == Shutdown ==
    /// Stops the worker pool. In-flight tasks are abandoned; they are
    /// idempotent and will be redone if ever needed again.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        self.notify.notify_waiters();
        let mut workers = self.workers.lock().unwrap_or_else(|p| p.into_inner());
        for handle in workers.drain(..) {
            handle.abort();
        }
        info!("prefetch scheduler stopped");
    }

    // == Observe ==
    /// Records a pattern and immediately runs the analysis step:
    /// queries seen `repeat_threshold`-or-more times within the recent
    /// window have their related queries enqueued at LOW priority,
    /// skipping pairs already queued. Synchronous; never suspends.
    pub fn observe(&self, pattern: SearchPattern) {
        let mut enqueued = 0usize;
        {
            let mut state = self.state();
            state.log.record(pattern);

            // Frequency per distinct query in the window, with the
            // category of its most recent occurrence.
            let mut frequency: HashMap<String, (usize, Category)> = HashMap::new();
            for observed in state.log.recent(self.config.window) {
                let slot = frequency
                    .entry(observed.query.clone())
                    .or_insert((0, observed.category));
                slot.0 += 1;
                slot.1 = observed.category;
            }

            for (query, (count, category)) in frequency {
                if count < self.config.repeat_threshold {
                    continue;
                }
                for related in self.seeds.related(&query) {
                    if state
                        .queue
                        .enqueue(related, category, TaskPriority::Low)
                        .is_some()
                    {
                        enqueued += 1;
                        debug!(%related, %category, "enqueued related prefetch");
                    }
                }
            }
        }

        for _ in 0..enqueued {
            self.notify.notify_one();
        }
    }

    // == Request Prefetch ==
    /// Explicitly enqueues a speculative fetch. Used for the seed list
    /// and available to hosts that want manual warmup.
    pub fn request_prefetch(&self, query: &str, category: Category, priority: TaskPriority) -> bool {
        let enqueued = self.state().queue.enqueue(query, category, priority).is_some();
        if enqueued {
            self.notify.notify_one();
        }
        enqueued
    }

    fn enqueue_seeds(&self) {
        let seed_queries = self.seeds.seed_queries.clone();
        for (category, queries) in seed_queries {
            let priority = PrefetchSeeds::seed_priority(category);
            for query in queries {
                self.request_prefetch(&query, category, priority);
            }
        }
    }

    // == Worker Loop ==
    /// One worker: pop from the queue front, run, wait when idle. The
    /// pool size bounds external fetch concurrency.
    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        let mut shutdown_rx = self.shutdown.subscribe();
        debug!(worker_id, "prefetch worker running");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let task = self.state().queue.pop();
            match task {
                Some(task) => self.run_task(task).await,
                None => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = shutdown_rx.changed() => break,
                    }
                }
            }
        }

        debug!(worker_id, "prefetch worker stopped");
    }

    // == Run Task ==
    /// Executes one crawl task through its state machine. All failures
    /// are contained here.
    async fn run_task(&self, mut task: CrawlTask) {
        task.status = TaskStatus::Processing;
        let key = cache_key(task.category, &task.query);

        // A user query may already have warmed this key
        if self.store.is_warm(&key).await {
            task.status = TaskStatus::Completed;
            self.tasks_completed.fetch_add(1, Ordering::Relaxed);
            debug!(task_id = task.id, %key, "key already warm, skipping fetch");
            return;
        }

        let Some(fetch) = self.registry.get(task.category) else {
            self.tasks_skipped.fetch_add(1, Ordering::Relaxed);
            warn!(category = %task.category, query = %task.query, "no fetcher registered, task skipped");
            return;
        };

        match fetch(task.query.clone()).await {
            Ok(payload) => {
                self.store.set(&key, payload, task.category).await;
                task.status = TaskStatus::Completed;
                self.tasks_completed.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = task.id, %key, "prefetched");
            }
            Err(e) => {
                if task.retry_count < self.config.retry_limit {
                    task.retry_count += 1;
                    task.status = TaskStatus::Pending;
                    debug!(
                        task_id = task.id,
                        retry = task.retry_count,
                        error = %e,
                        "prefetch failed, requeueing"
                    );
                    self.state().queue.requeue(task);
                    self.notify.notify_one();
                } else {
                    task.status = TaskStatus::Failed;
                    self.tasks_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(task_id = task.id, query = %task.query, error = %e, "prefetch dropped after retries");
                }
            }
        }

        // Pace outbound traffic between external calls
        tokio::time::sleep(self.config.fetch_delay).await;
    }

    // == Stats ==
    pub fn stats(&self) -> SchedulerStats {
        let state = self.state();
        SchedulerStats {
            queue_depth: state.queue.len(),
            patterns_recorded: state.log.len(),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_skipped: self.tasks_skipped.load(Ordering::Relaxed),
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.state().queue.len()
    }

    #[cfg(test)]
    fn queued_queries(&self) -> Vec<String> {
        let mut state = self.state();
        let mut queries = Vec::new();
        while let Some(task) = state.queue.pop() {
            queries.push(task.query);
        }
        queries
    }
}

impl std::fmt::Debug for PrefetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchScheduler")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DurableTier, TtlTable};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    async fn test_store() -> Arc<CacheStore> {
        let durable = DurableTier::open_in_memory().await.unwrap();
        Arc::new(CacheStore::new(durable, 100, TtlTable::default()))
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            fetch_delay: Duration::from_millis(1),
            ..SchedulerConfig::default()
        }
    }

    fn counting_registry(
        category: Category,
        counter: Arc<AtomicUsize>,
        result: Result<Value, FetchError>,
    ) -> FetcherRegistry {
        let mut registry = FetcherRegistry::new();
        registry.register(category, move |_query| {
            let counter = Arc::clone(&counter);
            let result = result.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                result
            }
        });
        registry
    }

    fn headache_seeds() -> PrefetchSeeds {
        let mut seeds = PrefetchSeeds::empty();
        seeds.related_queries.insert(
            "headache".to_string(),
            vec!["migraine".to_string(), "tension headache".to_string()],
        );
        seeds
    }

    #[tokio::test]
    async fn test_repeated_query_enqueues_relations_once() {
        let scheduler = PrefetchScheduler::new(
            test_store().await,
            FetcherRegistry::new(),
            headache_seeds(),
            fast_config(),
        );

        scheduler.observe(SearchPattern::new("headache", Category::Symptoms, 1));
        assert_eq!(scheduler.queue_depth(), 0);

        scheduler.observe(SearchPattern::new("headache", Category::Symptoms, 1));
        assert_eq!(scheduler.queue_depth(), 2);

        // A third observation must not enqueue duplicates
        scheduler.observe(SearchPattern::new("headache", Category::Symptoms, 1));
        assert_eq!(scheduler.queue_depth(), 2);

        let mut queued = scheduler.queued_queries();
        queued.sort();
        assert_eq!(queued, vec!["migraine", "tension headache"]);
    }

    #[tokio::test]
    async fn test_single_occurrence_enqueues_nothing() {
        let scheduler = PrefetchScheduler::new(
            test_store().await,
            FetcherRegistry::new(),
            headache_seeds(),
            fast_config(),
        );

        scheduler.observe(SearchPattern::new("headache", Category::Symptoms, 1));
        scheduler.observe(SearchPattern::new("fever", Category::Symptoms, 1));
        assert_eq!(scheduler.queue_depth(), 0);
    }

    #[tokio::test]
    async fn test_repetition_outside_window_ignored() {
        let config = SchedulerConfig {
            window: 2,
            ..fast_config()
        };
        let scheduler = PrefetchScheduler::new(
            test_store().await,
            FetcherRegistry::new(),
            headache_seeds(),
            config,
        );

        scheduler.observe(SearchPattern::new("headache", Category::Symptoms, 1));
        scheduler.observe(SearchPattern::new("fever", Category::Symptoms, 1));
        // First "headache" has scrolled out of the 2-entry window
        scheduler.observe(SearchPattern::new("headache", Category::Symptoms, 1));
        assert_eq!(scheduler.queue_depth(), 0);
    }

    #[tokio::test]
    async fn test_seed_list_enqueued_on_start() {
        let mut seeds = PrefetchSeeds::empty();
        seeds
            .seed_queries
            .insert(Category::Symptoms, vec!["chest pain".to_string()]);
        seeds
            .seed_queries
            .insert(Category::Literature, vec!["sepsis guidelines".to_string()]);

        let scheduler = PrefetchScheduler::new(
            test_store().await,
            FetcherRegistry::new(),
            seeds,
            fast_config(),
        );

        scheduler.enqueue_seeds();
        assert_eq!(scheduler.queue_depth(), 2);
    }

    #[tokio::test]
    async fn test_worker_fetches_and_stores() {
        let store = test_store().await;
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(
            Category::Symptoms,
            Arc::clone(&counter),
            Ok(json!({"name": "migraine"})),
        );

        let scheduler = PrefetchScheduler::new(
            Arc::clone(&store),
            registry,
            PrefetchSeeds::empty(),
            fast_config(),
        );
        scheduler.start();
        scheduler.request_prefetch("migraine", Category::Symptoms, TaskPriority::Low);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(store.is_warm("symptoms:migraine").await);
        assert_eq!(scheduler.stats().tasks_completed, 1);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_warm_key_completes_without_fetch() {
        let store = test_store().await;
        store.set("symptoms:migraine", json!("cached"), Category::Symptoms).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(Category::Symptoms, Arc::clone(&counter), Ok(json!("x")));

        let scheduler = PrefetchScheduler::new(
            Arc::clone(&store),
            registry,
            PrefetchSeeds::empty(),
            fast_config(),
        );
        scheduler.start();
        scheduler.request_prefetch("migraine", Category::Symptoms, TaskPriority::Low);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.stats().tasks_completed, 1);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_failed_task_retries_then_drops() {
        let store = test_store().await;
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(
            Category::Drugs,
            Arc::clone(&counter),
            Err(FetchError::Upstream("503".to_string())),
        );

        let config = SchedulerConfig {
            retry_limit: 2,
            ..fast_config()
        };
        let scheduler =
            PrefetchScheduler::new(Arc::clone(&store), registry, PrefetchSeeds::empty(), config);
        scheduler.start();
        scheduler.request_prefetch("warfarin", Category::Drugs, TaskPriority::Low);

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Initial attempt plus two retries
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.stats().tasks_failed, 1);
        assert!(!store.is_warm("drugs:warfarin").await);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_unregistered_category_skipped() {
        let scheduler = PrefetchScheduler::new(
            test_store().await,
            FetcherRegistry::new(),
            PrefetchSeeds::empty(),
            fast_config(),
        );
        scheduler.start();
        scheduler.request_prefetch("anything", Category::Rules, TaskPriority::Low);

        tokio::time::sleep(Duration::from_millis(50)).await;

        let stats = scheduler.stats();
        assert_eq!(stats.tasks_skipped, 1);
        assert_eq!(stats.tasks_failed, 0);
        assert_eq!(stats.queue_depth, 0);

        scheduler.shutdown();
    }
}
