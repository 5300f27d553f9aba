//! Building blocks for the poller: a delay schedule and a circuit breaker.
//!
//! Neither type sleeps or performs I/O; [`Poller`](crate::poll::Poller)
//! combines them around a [`DataSource`](crate::source::DataSource).

mod backoff;
mod breaker;

pub use backoff::Backoff;
pub use breaker::{CircuitBreaker, CircuitState, Permit};
