//! `ResilientCaller`: one upstream call wrapped in timeout, retry with
//! backoff, and the circuit breaker.
//!
//! The operation classifies its own failures: `Transient` failures are
//! retried and count against the breaker, `Permanent` failures are a valid
//! negative answer, returned immediately and invisible to the breaker's
//! failure counter. Anything the operation cannot classify should be
//! reported as transient (fail-safe default).

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::breaker::{BreakerConfig, CircuitBreaker, CircuitState, Permit};
use crate::retry::RetryConfig;

/// Failure of a single attempt, classified by the operation.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    /// Infrastructure fault (timeout, connect error, 5xx). Retryable.
    #[error("transient failure: {0}")]
    Transient(anyhow::Error),
    /// Valid negative answer. Never retried, never opens the circuit.
    #[error("{0}")]
    Permanent(E),
}

/// Terminal outcome of an enveloped call.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// Retries exhausted (or the half-open probe failed).
    #[error("{target} call failed after {attempts} attempts: {cause}")]
    Transient {
        target: &'static str,
        attempts: u32,
        cause: anyhow::Error,
    },
    /// The operation's own permanent failure, passed through.
    #[error("{0}")]
    Permanent(E),
    /// The breaker rejected the call without contacting the upstream.
    #[error("{target} circuit breaker is open")]
    CircuitOpen { target: &'static str },
}

pub type CallOutcome<T, E> = Result<T, CallError<E>>;

/// Per-target envelope configuration.
#[derive(Debug, Clone)]
pub struct CallerConfig {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_multiplier: u32,
    pub per_attempt_timeout: Duration,
    pub failure_threshold: u32,
    pub open_duration: Duration,
}

impl Default for CallerConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        let breaker = BreakerConfig::default();
        Self {
            max_retries: retry.max_retries,
            backoff_base: retry.backoff_base,
            backoff_multiplier: retry.backoff_multiplier,
            per_attempt_timeout: Duration::from_secs(10),
            failure_threshold: breaker.failure_threshold,
            open_duration: breaker.open_duration,
        }
    }
}

pub struct ResilientCaller {
    target: &'static str,
    breaker: CircuitBreaker,
    retry: RetryConfig,
    per_attempt_timeout: Duration,
}

impl ResilientCaller {
    pub fn new(target: &'static str, config: CallerConfig) -> Self {
        let breaker = CircuitBreaker::new(
            target,
            BreakerConfig {
                failure_threshold: config.failure_threshold,
                open_duration: config.open_duration,
            },
        );
        let retry = RetryConfig {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            backoff_multiplier: config.backoff_multiplier,
            ..RetryConfig::default()
        };
        Self {
            target,
            breaker,
            retry,
            per_attempt_timeout: config.per_attempt_timeout,
        }
    }

    /// Current breaker state, for health reporting.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Consecutive-failure count of the underlying breaker.
    pub fn consecutive_failures(&self) -> u32 {
        self.breaker.consecutive_failures()
    }

    /// Run `operation` under the resilience envelope.
    ///
    /// Each attempt is bounded by the per-attempt timeout; exceeding it
    /// counts as a transient failure. A half-open probe gets exactly one
    /// attempt regardless of the retry budget, to fail fast.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> CallOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
        E: std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        loop {
            // The probe guard reopens the circuit if this future is
            // dropped before the attempt records an outcome.
            let probe = match self.breaker.try_acquire() {
                Permit::Attempt => None,
                Permit::Probe(guard) => Some(guard),
                Permit::Rejected => {
                    debug!(upstream = self.target, "call rejected, circuit open");
                    return Err(CallError::CircuitOpen {
                        target: self.target,
                    });
                }
            };
            let is_probe = probe.is_some();

            let outcome = match tokio::time::timeout(self.per_attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::Transient(anyhow::anyhow!(
                    "attempt timed out after {:?}",
                    self.per_attempt_timeout
                ))),
            };

            if let Some(guard) = probe {
                guard.complete();
            }
            match outcome {
                Ok(value) => {
                    self.breaker.on_success();
                    if attempt > 0 {
                        debug!(
                            upstream = self.target,
                            retries = attempt,
                            "call succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(AttemptError::Permanent(err)) => {
                    self.breaker.on_permanent();
                    debug!(upstream = self.target, error = %err, "permanent failure, not retrying");
                    return Err(CallError::Permanent(err));
                }
                Err(AttemptError::Transient(cause)) => {
                    self.breaker.on_failure();
                    let exhausted = attempt >= self.retry.max_retries;
                    if is_probe || exhausted {
                        warn!(
                            upstream = self.target,
                            attempts = attempt + 1,
                            error = %cause,
                            "giving up on upstream call"
                        );
                        return Err(CallError::Transient {
                            target: self.target,
                            attempts: attempt + 1,
                            cause,
                        });
                    }
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        upstream = self.target,
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_retries + 1,
                        ?delay,
                        error = %cause,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
