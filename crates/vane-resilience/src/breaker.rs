//! Circuit breaker state machine, one instance per upstream target.
//!
//! State lives behind a `parking_lot::Mutex` and is never held across an
//! await point; the breaker is the only state shared between concurrent
//! requests. Transitions:
//!
//! - Closed: calls pass. Each failure increments the consecutive-failure
//!   counter; reaching the threshold opens the circuit. Success resets it.
//! - Open: calls are rejected without touching the upstream until the
//!   open duration elapses, then the next acquire becomes a half-open probe.
//! - HalfOpen: exactly one probe is in flight, tracked by an RAII guard.
//!   Probe success closes the circuit, probe failure reopens it, and a
//!   probe whose future is dropped mid-flight reopens it too.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the circuit.
    pub failure_threshold: u32,
    /// Cooldown before an open circuit allows a probe.
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(60),
        }
    }
}

/// Outcome of asking the breaker for permission to attempt a call.
pub enum Permit<'a> {
    /// Circuit is closed; attempt normally.
    Attempt,
    /// Circuit was open long enough; this call is the single half-open probe.
    Probe(ProbeGuard<'a>),
    /// Circuit is open (or a probe is already in flight); fail fast.
    Rejected,
}

/// Release handle for the half-open probe slot.
///
/// The holder calls `complete` once it has recorded the probe's outcome
/// through the breaker. If the guard is dropped armed, the attempt was
/// cancelled mid-flight, and the breaker reopens as if the probe had
/// failed. Without this, a dropped probe future would leave the slot
/// occupied and the breaker would reject every later call.
pub struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl ProbeGuard<'_> {
    /// The probe produced an outcome; release the slot without touching
    /// breaker state. The caller records the outcome itself.
    pub fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.on_probe_abandoned();
        }
    }
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_time: Option<Instant>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        debug!(breaker = name, ?config, "creating circuit breaker");
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_time: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ask for permission to make one attempt. Lazily transitions an
    /// expired Open state to HalfOpen.
    pub fn try_acquire(&self) -> Permit<'_> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Permit::Attempt,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure_time
                    .is_some_and(|t| t.elapsed() >= self.config.open_duration);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    info!(breaker = self.name, "circuit half-open, allowing probe");
                    Permit::Probe(ProbeGuard {
                        breaker: self,
                        armed: true,
                    })
                } else {
                    Permit::Rejected
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Permit::Rejected
                } else {
                    inner.probe_in_flight = true;
                    Permit::Probe(ProbeGuard {
                        breaker: self,
                        armed: true,
                    })
                }
            }
        }
    }

    /// Record a successful attempt.
    pub fn on_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.probe_in_flight = false;
                info!(breaker = self.name, "circuit closed after successful probe");
            }
            _ => {
                inner.consecutive_failures = 0;
            }
        }
    }

    /// Record a failed attempt that reached the upstream.
    pub fn on_failure(&self) {
        let mut inner = self.inner.lock();
        inner.last_failure_time = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                debug!(
                    breaker = self.name,
                    failures = inner.consecutive_failures,
                    threshold = self.config.failure_threshold,
                    "upstream failure recorded"
                );
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        breaker = self.name,
                        failures = inner.consecutive_failures,
                        "circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.probe_in_flight = false;
                warn!(breaker = self.name, "circuit reopened after failed probe");
            }
            CircuitState::Open => {}
        }
    }

    /// Record a permanent (non-infrastructure) outcome.
    ///
    /// A valid negative answer proves the upstream is reachable, so it
    /// closes a half-open circuit, but it is not an upstream health
    /// signal in the closed state and leaves the failure counter alone.
    pub fn on_permanent(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.consecutive_failures = 0;
            inner.probe_in_flight = false;
            info!(breaker = self.name, "circuit closed, probe reached upstream");
        }
    }

    /// The probe future was dropped before it could record an outcome.
    /// Reopen and restart the cooldown, same as a failed probe.
    fn on_probe_abandoned(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen && inner.probe_in_flight {
            inner.state = CircuitState::Open;
            inner.probe_in_flight = false;
            inner.last_failure_time = Some(Instant::now());
            warn!(breaker = self.name, "probe cancelled, circuit reopened");
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Current consecutive-failure count (diagnostics and tests).
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }
}
