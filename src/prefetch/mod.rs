//! Prefetch Module
//!
//! Pattern recording and the predictive prefetch scheduler: repeated
//! queries in the recent window are expanded through a relation table into
//! background fetch tasks, executed by a bounded worker pool.

mod pattern;
mod queue;
mod scheduler;
mod seeds;
mod task;

// Re-export public types
pub use pattern::{PatternLog, SearchPattern};
pub use queue::TaskQueue;
pub use scheduler::{
    BoxedFetchFuture, FetchFn, FetcherRegistry, PrefetchScheduler, SchedulerConfig, SchedulerStats,
};
pub use seeds::PrefetchSeeds;
pub use task::{CrawlTask, TaskPriority, TaskStatus};
