//! Exponential backoff for speech synthesis requests

use std::time::Duration;

/// Retry policy for synthesis requests
///
/// A request is attempted once and then retried up to `max_retries` times,
/// sleeping `base_delay * 2^attempt` before each retry. There is no jitter:
/// the delays are part of the contract (1 s, 2 s, 4 s by default). An attempt
/// still pending after `attempt_timeout` counts as failed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first request
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Upper bound on a single request
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Total number of requests made before giving up
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Whether a failed request at `attempt` (zero-based) should be retried
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay to wait after a failed request at `attempt` (zero-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}
