//! Retry policy and the FIFO retry queue.

use std::collections::VecDeque;

use super::types::RetryItem;

/// Default attempt ceiling: one initial send plus two retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Whether a failed zero-based attempt may be followed by another one.
pub fn should_retry(attempt_number: u32, max_attempts: u32) -> bool {
    attempt_number.saturating_add(1) < max_attempts
}

/// Retry policy applied after every failed delivery attempt.
///
/// Every failure is treated alike, whatever the provider reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn should_retry(&self, attempt_number: u32) -> bool {
        should_retry(attempt_number, self.max_attempts)
    }

    /// True once `attempts` sends have used up the ceiling.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// FIFO of failed sends awaiting another attempt.
#[derive(Debug, Default)]
pub struct RetryQueue {
    items: VecDeque<RetryItem>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: RetryItem) {
        self.items.push_back(item);
    }

    pub fn pop(&mut self) -> Option<RetryItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
