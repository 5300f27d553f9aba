//! Delay schedules for retries and for fetches after a failure.

use std::time::Duration;

/// Delay schedule between attempts: `delay × multiplier^n`, capped at
/// `max_delay`.  No jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl Backoff {
    /// The same delay every time.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    pub fn exponential(delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            delay,
            multiplier,
            max_delay,
        }
    }

    /// Delay to wait before the `n`th retry (0-indexed: the first retry is 0).
    pub fn delay_for(&self, n: u32) -> Duration {
        let exponent = i32::try_from(n).unwrap_or(i32::MAX);
        let secs = self.delay.as_secs_f64() * self.multiplier.powi(exponent);

        // Overflowing f64 -> Duration conversion panics, so clamp first.
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
