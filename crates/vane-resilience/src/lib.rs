//! Resilience envelope for upstream calls.
//!
//! Combines a per-target circuit breaker with bounded retry, exponential
//! backoff, and a per-attempt timeout. The envelope knows nothing about
//! weather; callers supply an operation that classifies its own failures
//! as transient (retryable) or permanent (a valid negative answer).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod breaker;
pub mod caller;
pub mod retry;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use caller::{AttemptError, CallError, CallOutcome, CallerConfig, ResilientCaller};
pub use retry::{is_retryable_status, RetryConfig};
