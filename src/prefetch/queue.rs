//! Task Queue Module
//!
//! Priority-aware deque for crawl tasks. High-priority tasks go to the
//! front (LIFO among themselves, always ahead of the rest); Medium and Low
//! go to the back and drain FIFO. Workers pop from the front.

use std::collections::VecDeque;

use crate::cache::Category;
use crate::prefetch::{CrawlTask, TaskPriority};

// == Task Queue ==
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<CrawlTask>,
    next_id: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // == Enqueue ==
    /// Enqueues a task unless the same query+category pair is already
    /// queued. Returns the task id, or `None` when deduplicated.
    pub fn enqueue(
        &mut self,
        query: &str,
        category: Category,
        priority: TaskPriority,
    ) -> Option<u64> {
        if self.is_queued(query, category) {
            return None;
        }

        self.next_id += 1;
        let task = CrawlTask::new(self.next_id, query, category, priority);
        let id = task.id;
        match priority {
            TaskPriority::High => self.tasks.push_front(task),
            TaskPriority::Medium | TaskPriority::Low => self.tasks.push_back(task),
        }
        Some(id)
    }

    // == Requeue ==
    /// Re-inserts a retried task at its priority's position: High back to
    /// the front, Medium and Low to the back.
    pub fn requeue(&mut self, task: CrawlTask) {
        match task.priority {
            TaskPriority::High => self.tasks.push_front(task),
            TaskPriority::Medium | TaskPriority::Low => self.tasks.push_back(task),
        }
    }

    // == Pop ==
    /// Takes the front task, if any.
    pub fn pop(&mut self) -> Option<CrawlTask> {
        self.tasks.pop_front()
    }

    // == Is Queued ==
    /// Whether a query+category pair is already waiting in the queue.
    pub fn is_queued(&self, query: &str, category: Category) -> bool {
        self.tasks
            .iter()
            .any(|t| t.category == category && t.query == query)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
