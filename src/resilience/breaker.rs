//! Circuit breaker state machine.
//!
//! The breaker never reads the clock; callers pass `now`.

use std::time::{Duration, Instant};

use tracing::info;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls go through.
    Closed,
    /// Calls are rejected until the reset interval has passed.
    Open,
    /// One probe call is allowed to decide between Closed and Open.
    HalfOpen,
}

/// Outcome of asking the breaker whether a call may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    /// Normal call, retries allowed.
    Allowed,
    /// Single probe after the reset interval; no retries.
    Probe,
    /// Circuit is open; use the fallback.
    Rejected,
}

/// Consecutive-failure circuit breaker.
///
/// Every transition happens in reaction to [`try_acquire`](Self::try_acquire),
/// [`on_success`](Self::on_success) or [`on_failure`](Self::on_failure).  Time
/// is passed in by the caller so the state machine itself never reads a clock.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    failure_threshold: u32,
    reset_interval: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_interval: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            failure_threshold: failure_threshold.max(1),
            reset_interval,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn try_acquire(&mut self, now: Instant) -> Permit {
        match self.state {
            CircuitState::Closed => Permit::Allowed,
            CircuitState::HalfOpen => Permit::Probe,
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|opened| now.saturating_duration_since(opened))
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.reset_interval {
                    self.transition_to(CircuitState::HalfOpen);
                    Permit::Probe
                } else {
                    Permit::Rejected
                }
            }
        }
    }

    pub fn on_success(&mut self) {
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.transition_to(CircuitState::Closed);
    }

    pub fn on_failure(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        let trip = match self.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => self.consecutive_failures >= self.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            // Restarts the reset timer when a probe fails.
            self.opened_at = Some(now);
            self.transition_to(CircuitState::Open);
        }
    }

    fn transition_to(&mut self, state: CircuitState) {
        if self.state == state {
            return;
        }
        info!(
            from = ?self.state,
            to = ?state,
            consecutive_failures = self.consecutive_failures,
            "circuit breaker transition"
        );
        self.state = state;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
