//! Pattern Recorder Module
//!
//! A bounded rolling log of recent query observations. Pure in-memory
//! bookkeeping; appending never suspends.

use chrono::{DateTime, Utc};

use crate::cache::Category;

// == Search Pattern ==
/// One immutable observation of a gateway lookup.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    /// The query as the caller issued it
    pub query: String,
    /// Category it was looked up under
    pub category: Category,
    /// When the lookup happened
    pub timestamp: DateTime<Utc>,
    /// Result size: element count for sequences, 1 for scalar payloads
    pub result_count: usize,
}

impl SearchPattern {
    pub fn new(query: impl Into<String>, category: Category, result_count: usize) -> Self {
        Self {
            query: query.into(),
            category,
            timestamp: Utc::now(),
            result_count,
        }
    }
}

// == Pattern Log ==
/// Fixed-size FIFO ring of observations; oldest evicted first.
#[derive(Debug)]
pub struct PatternLog {
    patterns: std::collections::VecDeque<SearchPattern>,
    capacity: usize,
}

impl PatternLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            patterns: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an observation, evicting the oldest past capacity.
    pub fn record(&mut self, pattern: SearchPattern) {
        if self.capacity == 0 {
            return;
        }
        if self.patterns.len() >= self.capacity {
            self.patterns.pop_front();
        }
        self.patterns.push_back(pattern);
    }

    /// The most recent `n` observations, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &SearchPattern> {
        let skip = self.patterns.len().saturating_sub(n);
        self.patterns.iter().skip(skip)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
