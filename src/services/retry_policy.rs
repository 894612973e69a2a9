//! Retry budget and exponential backoff for scheduler work items.

use std::time::Duration;

use crate::domain::models::{FailureClass, RetryConfig};

/// Retry policy with exponential backoff.
///
/// Backoff doubles with each failed attempt, starting at
/// `initial_backoff_ms` and capped at `max_backoff_ms`:
/// 2s -> 4s -> 8s -> ... -> 60s with the defaults.
///
/// Transport, content and quality failures are retried until the attempt
/// budget is spent. Storage failures are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first
    pub max_attempts: u32,

    /// Initial backoff duration in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }
}

impl RetryPolicy {
    /// Policy with at least one attempt and a cap no lower than the initial backoff.
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
        }
    }

    /// Whether a failure class may be retried at all.
    pub fn is_retryable(&self, class: FailureClass) -> bool {
        !matches!(class, FailureClass::Storage)
    }

    /// Whether an item that has made `attempts_made` attempts and just
    /// failed with `class` gets another one.
    pub fn should_retry(&self, class: FailureClass, attempts_made: u32) -> bool {
        self.is_retryable(class) && attempts_made < self.max_attempts
    }

    /// Backoff before the retry following failed attempt number `attempt` (0-based).
    ///
    /// Formula: `min(initial_backoff * 2^attempt, max_backoff)`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let multiplier = 2_u64.saturating_pow(attempt);
        let backoff_ms = self.initial_backoff_ms.saturating_mul(multiplier);
        Duration::from_millis(backoff_ms.min(self.max_backoff_ms))
    }
}
