//! Slow, cancellable emission of a catalog snapshot.
//!
//! [`Emitter::into_stream`] turns a snapshot into a pull-driven stream: an
//! item is only produced when the consumer polls for it, and a fixed delay is
//! spent before each one to simulate a slow backend.  The stream ends with a
//! single [`Signal::Complete`] after the last item, unless it was cancelled,
//! in which case it just stops.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};

use crate::source::Beer;

/// What the emitter hands to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Item(Beer),
    /// Every item has been produced.  Never sent after a cancellation.
    Complete,
}

/// Shared view of a running emission: cancel it, or see how far it got.
#[derive(Debug, Clone, Default)]
pub struct EmitterHandle {
    cancelled: Arc<AtomicBool>,
    produced: Arc<AtomicUsize>,
}

impl EmitterHandle {
    /// Stop producing.  Takes effect before the next item.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Number of items produced so far.
    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }
}

/// Emits a fixed snapshot one item at a time.
pub struct Emitter {
    beers: Arc<Vec<Beer>>,
    delay: Duration,
    handle: EmitterHandle,
}

impl Emitter {
    pub fn new(beers: Arc<Vec<Beer>>, delay: Duration) -> Self {
        Self {
            beers,
            delay,
            handle: EmitterHandle::default(),
        }
    }

    pub fn handle(&self) -> EmitterHandle {
        self.handle.clone()
    }

    /// Consume the emitter as a stream of [`Signal`]s.
    ///
    /// Dropping the stream before it finishes cancels the emission.
    pub fn into_stream(self) -> impl Stream<Item = Signal> + Send + 'static {
        let state = Cursor {
            beers: self.beers,
            delay: self.delay,
            next: 0,
            done: false,
            handle: self.handle,
        };

        stream::unfold(state, |mut cursor| async move {
            if cursor.done || cursor.handle.is_cancelled() {
                return None;
            }
            if cursor.next == cursor.beers.len() {
                cursor.done = true;
                return Some((Signal::Complete, cursor));
            }

            tokio::time::sleep(cursor.delay).await;
            // The consumer may have given up while we were waiting.
            if cursor.handle.is_cancelled() {
                return None;
            }

            let beer = cursor.beers[cursor.next].clone();
            cursor.next += 1;
            cursor.handle.produced.fetch_add(1, Ordering::SeqCst);
            Some((Signal::Item(beer), cursor))
        })
    }
}

struct Cursor {
    beers: Arc<Vec<Beer>>,
    delay: Duration,
    next: usize,
    done: bool,
    handle: EmitterHandle,
}

impl Drop for Cursor {
    // Dropped before completion means the consumer went away.
    fn drop(&mut self) {
        if !self.done {
            self.handle.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn sample_beers() -> Arc<Vec<Beer>> {
        Arc::new(vec![
            Beer::new(Some(1), "Luzerner Bier", "Brauerei Luzern AG"),
            Beer::new(Some(2), "Lozärner Bier", "Lozärner Bier AG"),
            Beer::new(Some(3), "Urbräu", "Tavolago AG"),
        ])
    }

    #[tokio::test]
    async fn emits_every_item_then_completes() {
        let beers = sample_beers();
        let emitter = Emitter::new(Arc::clone(&beers), Duration::ZERO);
        let handle = emitter.handle();
        let signals: Vec<Signal> = emitter.into_stream().collect().await;

        let mut expected: Vec<Signal> = beers.iter().cloned().map(Signal::Item).collect();
        expected.push(Signal::Complete);
        assert_eq!(signals, expected);
        assert!(!handle.is_cancelled(), "completion is not cancellation");
        assert_eq!(handle.produced(), 3);
    }

    #[tokio::test]
    async fn empty_snapshot_only_completes() {
        let signals: Vec<Signal> = Emitter::new(Arc::new(Vec::new()), Duration::ZERO)
            .into_stream()
            .collect()
            .await;

        assert_eq!(signals, vec![Signal::Complete]);
    }

    #[tokio::test]
    async fn cancel_after_k_items_stops_production_without_completion() {
        let emitter = Emitter::new(sample_beers(), Duration::ZERO);
        let handle = emitter.handle();
        let mut stream = Box::pin(emitter.into_stream());

        assert!(matches!(stream.next().await, Some(Signal::Item(_))));
        assert!(matches!(stream.next().await, Some(Signal::Item(_))));
        handle.cancel();

        assert_eq!(stream.next().await, None, "no item and no completion after cancel");
        assert_eq!(handle.produced(), 2);
    }

    #[tokio::test]
    async fn cancel_during_delay_suppresses_pending_item() {
        let emitter = Emitter::new(sample_beers(), Duration::from_millis(50));
        let handle = emitter.handle();
        let mut stream = Box::pin(emitter.into_stream());

        let canceller = {
            let handle = handle.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                handle.cancel();
            })
        };

        assert_eq!(stream.next().await, None);
        canceller.await.unwrap();
        assert_eq!(handle.produced(), 0);
    }

    #[tokio::test]
    async fn items_are_produced_lazily() {
        let emitter = Emitter::new(sample_beers(), Duration::ZERO);
        let handle = emitter.handle();
        let mut stream = Box::pin(emitter.into_stream());

        assert_eq!(handle.produced(), 0, "nothing before the first poll");
        stream.next().await;
        assert_eq!(handle.produced(), 1);
    }

    #[tokio::test]
    async fn dropping_the_stream_cancels() {
        let emitter = Emitter::new(sample_beers(), Duration::ZERO);
        let handle = emitter.handle();
        let mut stream = Box::pin(emitter.into_stream());
        stream.next().await;

        drop(stream);

        assert!(handle.is_cancelled());
        assert_eq!(handle.produced(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_delay_before_each_item() {
        let delay = Duration::from_secs(1);
        let started = tokio::time::Instant::now();

        let signals: Vec<Signal> = Emitter::new(sample_beers(), delay).into_stream().collect().await;

        assert_eq!(signals.len(), 4);
        assert!(started.elapsed() >= delay * 3);
    }
}
