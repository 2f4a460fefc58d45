//! Bounded recent-execution history

use std::collections::VecDeque;

use crate::format::round1;
use crate::models::{Execution, Job};

/// Executions retained per job by the list views, and the span every
/// success rate is computed over
pub const RECENT_EXECUTIONS: usize = 10;

/// Newest-first ring buffer of executions
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionWindow {
    entries: VecDeque<Execution>,
    capacity: usize,
}

impl Default for ExecutionWindow {
    fn default() -> Self {
        Self::with_capacity(RECENT_EXECUTIONS)
    }
}

impl ExecutionWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Window pre-filled from a newest-first history
    pub fn seeded<I>(capacity: usize, history: I) -> Self
    where
        I: IntoIterator<Item = Execution>,
    {
        let mut window = Self::with_capacity(capacity);
        window
            .entries
            .extend(history.into_iter().take(window.capacity));
        window
    }

    /// Prepend, dropping the oldest entry once full
    pub fn push(&mut self, execution: Execution) {
        self.entries.push_front(execution);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn newest(&self) -> Option<&Execution> {
        self.entries.front()
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &Execution> {
        self.entries.iter()
    }

    /// Percentage of successes among the newest `min(len, 10)` entries,
    /// rounded to one decimal; 0 when empty
    pub fn success_rate(&self) -> f64 {
        let span = self.entries.len().min(RECENT_EXECUTIONS);
        if span == 0 {
            return 0.0;
        }

        let successes = self
            .entries
            .iter()
            .take(span)
            .filter(|e| e.status.is_success())
            .count();
        round1(successes as f64 / span as f64 * 100.0)
    }
}

/// A job together with the executions observed for it
#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    pub job: Job,
    pub recent: ExecutionWindow,
}

impl JobEntry {
    /// Entry whose window takes over the newest fetched executions
    pub fn new(mut job: Job) -> Self {
        let history = std::mem::take(&mut job.executions);
        Self {
            job,
            recent: ExecutionWindow::seeded(RECENT_EXECUTIONS, history),
        }
    }

    /// Merge one live execution.
    ///
    /// `last_execution` and `avg_response_time` follow the newest event only.
    pub fn record(&mut self, execution: Execution) {
        self.job.last_execution = Some(execution.timestamp);
        self.job.avg_response_time = execution.response_time as f64;
        self.recent.push(execution);
        self.job.success_rate = self.recent.success_rate();
    }
}
