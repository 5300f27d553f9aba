//! Background polling.
//!
//! Runs a [`Poller`] on a dedicated thread, sending each outcome to the async
//! side over a channel.
//!
//! The schedule is fixed-delay: wait `initial_delay`, fetch, report, then wait
//! `fixed_delay` measured from the end of that fetch.  Fetches never overlap
//! and missed ticks are not queued, because there is only ever one loop
//! iteration in flight.  Retry delays inside a fetch block this thread only.

mod poller;

pub use poller::{Poller, PollerState, RetryPolicy};

use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::BeersSettings;
use crate::resilience::CircuitState;
use crate::source::Beer;

/// Messages sent from the poller thread.
#[derive(Debug)]
pub enum PollMsg {
    /// A healthy fetch returned these items.
    Items(Vec<Beer>),
    /// The fetch fell back to an empty list; this is where the poller stands.
    Degraded(PollerState),
}

/// When the polling loop runs.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub initial_delay: Duration,
    pub fixed_delay: Duration,
}

impl From<&BeersSettings> for Schedule {
    fn from(settings: &BeersSettings) -> Self {
        Self {
            initial_delay: settings.initial_delay,
            fixed_delay: settings.fixed_delay,
        }
    }
}

/// Spawn the background polling thread.
///
/// The thread runs until the process exits or the returned receiver is
/// dropped, whichever comes first.
pub fn spawn(mut poller: Poller, schedule: Schedule) -> mpsc::UnboundedReceiver<PollMsg> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::spawn(move || {
        thread::sleep(schedule.initial_delay);
        loop {
            let beers = poller.fetch();
            let state = poller.state();
            let msg = if state.circuit == CircuitState::Closed && state.consecutive_failures == 0 {
                PollMsg::Items(beers)
            } else {
                PollMsg::Degraded(state)
            };
            // Nobody is listening any more; stop polling.
            if tx.send(msg).is_err() {
                debug!("poll receiver dropped, stopping poller thread");
                return;
            }
            thread::sleep(schedule.fixed_delay);
        }
    });

    rx
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
