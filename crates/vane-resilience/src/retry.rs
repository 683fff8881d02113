//! Retry policy: what to retry and how long to wait between attempts.

use std::time::Duration;

use reqwest::StatusCode;

/// Default retry configuration
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt (total attempts = 1 + `max_retries`).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub backoff_base: Duration,
    /// Multiplier applied per attempt (exponential backoff).
    pub backoff_multiplier: u32,
    /// Ceiling on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            backoff_multiplier: 2,
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (zero-based):
    /// `backoff_base * backoff_multiplier^attempt`, capped at `max_backoff`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier).saturating_pow(attempt);
        let delay_ms = (self.backoff_base.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_backoff.as_millis() as u64))
    }
}

/// Whether an HTTP status is worth retrying.
///
/// Server errors and rate limiting are transient; everything else is a
/// definitive answer and retrying cannot change it.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
