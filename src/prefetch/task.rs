//! Crawl Task Module
//!
//! Background fetch tasks owned exclusively by the prefetch scheduler.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::Category;

// == Task Priority ==
/// Queue placement: High is pushed to the front, Medium and Low to the back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

// == Task Status ==
/// Lifecycle: `Pending -> Processing -> {Completed | Failed}`, with
/// `Failed` re-entering `Pending` while retries remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

// == Crawl Task ==
/// One speculative background fetch.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    pub id: u64,
    pub query: String,
    pub category: Category,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl CrawlTask {
    pub fn new(id: u64, query: impl Into<String>, category: Category, priority: TaskPriority) -> Self {
        Self {
            id,
            query: query.into(),
            category,
            priority,
            status: TaskStatus::Pending,
            retry_count: 0,
            enqueued_at: Utc::now(),
        }
    }
}
