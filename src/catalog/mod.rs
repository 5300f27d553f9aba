//! The in-memory beer catalog.
//!
//! [`Catalog`] is an append-only list shared between the HTTP handlers.
//! Readers take cheap [`Arc`] snapshots; an append clones the backing vector
//! only when a snapshot is still alive (copy-on-write via [`Arc::make_mut`]),
//! so a snapshot never changes underneath its holder.

mod emitter;

pub use emitter::{Emitter, Signal};

use std::sync::Arc;

use parking_lot::RwLock;

use crate::source::Beer;

/// Append-only, insertion-ordered store of [`Beer`]s.
///
/// Cloning a `Catalog` clones the handle, not the data.
#[derive(Clone, Default)]
pub struct Catalog {
    beers: Arc<RwLock<Arc<Vec<Beer>>>>,
}

impl Catalog {
    /// Add `beer` to the end.  Visible to every `list()` that starts after
    /// this returns.
    pub fn append(&self, beer: Beer) {
        let mut beers = self.beers.write();
        Arc::make_mut(&mut *beers).push(beer);
    }

    /// Snapshot of everything appended so far, in insertion order.
    pub fn list(&self) -> Arc<Vec<Beer>> {
        Arc::clone(&*self.beers.read())
    }

    pub fn len(&self) -> usize {
        self.beers.read().len()
    }
}

impl FromIterator<Beer> for Catalog {
    fn from_iter<I: IntoIterator<Item = Beer>>(iter: I) -> Self {
        Self {
            beers: Arc::new(RwLock::new(Arc::new(iter.into_iter().collect()))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
