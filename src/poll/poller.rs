//! Retry, circuit breaking and fallback around a single [`DataSource`].

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::BeersSettings;
use crate::resilience::{Backoff, CircuitBreaker, CircuitState, Permit};
use crate::source::{Beer, DataSource};

/// How many times one fetch may hit the source, and how long to wait between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Backoff,
}

/// Point-in-time view of the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerState {
    pub circuit: CircuitState,
    pub consecutive_failures: u32,
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Fetches from a [`DataSource`], never failing: when the source is
/// unavailable it falls back to an empty list.
pub struct Poller {
    source: Box<dyn DataSource>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    /// Pause before a fetch while earlier fetches are still failing.
    breaker_backoff: Backoff,
    last_attempt: Option<DateTime<Utc>>,
}

impl Poller {
    /// Create a poller around `source`.
    ///
    /// `breaker_backoff` is the pause before a fetch while the breaker is
    /// closed but still counting failures; `retry` governs attempts within a
    /// single fetch.
    pub fn new(
        source: Box<dyn DataSource>,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
        breaker_backoff: Backoff,
    ) -> Self {
        Self {
            source,
            retry,
            breaker,
            breaker_backoff,
            last_attempt: None,
        }
    }

    /// Build a poller from the `beers` section of the configuration.
    pub fn from_settings(source: Box<dyn DataSource>, settings: &BeersSettings) -> Self {
        let retry = RetryPolicy {
            attempts: settings.retry.attempts,
            backoff: Backoff::fixed(settings.retry.delay),
        };
        let cb = &settings.circuit_breaker;
        Self::new(
            source,
            retry,
            CircuitBreaker::new(cb.attempts, cb.reset),
            Backoff::exponential(cb.delay, cb.multiplier, cb.max_delay),
        )
    }

    /// Breaker state, failure count and time of the last attempt.
    pub fn state(&self) -> PollerState {
        PollerState {
            circuit: self.breaker.state(),
            consecutive_failures: self.breaker.consecutive_failures(),
            last_attempt: self.last_attempt,
        }
    }

    /// Fetch the current list, or an empty one if the source can't be reached.
    pub fn fetch(&mut self) -> Vec<Beer> {
        match self.breaker.try_acquire(Instant::now()) {
            Permit::Rejected => {
                debug!(source = self.source.name(), "circuit open, skipping call");
                self.fallback()
            }
            Permit::Probe => match self.attempt(1) {
                Ok(beers) => self.succeed(beers),
                Err(()) => {
                    self.breaker.on_failure(Instant::now());
                    self.fallback()
                }
            },
            Permit::Allowed => {
                let failures = self.breaker.consecutive_failures();
                if failures > 0 {
                    pause(self.breaker_backoff.delay_for(failures - 1));
                }

                let attempts = self.retry.attempts.max(1);
                for attempt in 1..=attempts {
                    if let Ok(beers) = self.attempt(attempt) {
                        return self.succeed(beers);
                    }
                    if attempt < attempts {
                        pause(self.retry.backoff.delay_for(attempt - 1));
                    }
                }

                error!(source = self.source.name(), attempts, "retries exhausted");
                self.breaker.on_failure(Instant::now());
                self.fallback()
            }
        }
    }

    fn attempt(&mut self, attempt: u32) -> Result<Vec<Beer>, ()> {
        self.last_attempt = Some(Utc::now());
        self.source.fetch().map_err(|e| {
            warn!(
                source = self.source.name(),
                attempt,
                error = %format!("{e:#}"),
                "fetch attempt failed"
            );
        })
    }

    fn succeed(&mut self, beers: Vec<Beer>) -> Vec<Beer> {
        self.breaker.on_success();
        debug!(source = self.source.name(), count = beers.len(), "fetch succeeded");
        beers
    }

    fn fallback(&self) -> Vec<Beer> {
        info!(
            source = self.source.name(),
            circuit = ?self.breaker.state(),
            consecutive_failures = self.breaker.consecutive_failures(),
            "fallback invoked, returning empty list"
        );
        Vec::new()
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
