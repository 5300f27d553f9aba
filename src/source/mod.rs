//! Data source abstraction layer.
//!
//! This module defines the [`DataSource`] trait and the common [`Beer`]
//! record.  The only concrete source is [`HttpSource`], which reads the JSON
//! list served by `GET /beers`.
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory (e.g. `file.rs`).
//! 2. Define a struct (e.g. `FileSource`) and implement [`DataSource`] for it.
//! 3. Add `mod file;` below and re-export your struct in the `pub use` block.
//! 4. Hand an instance to [`Poller::new`](crate::poll::Poller::new) in `main.rs`.
//!
//! Retry, circuit breaking and fallback all live in the poller, so a source
//! only has to report what happened on one attempt.

mod beer;
mod http;

pub use beer::Beer;
pub use http::HttpSource;

use anyhow::Result;

/// Trait that every data source must implement.
///
/// The poller calls [`fetch()`](DataSource::fetch) from its own background
/// thread, so implementations must be [`Send`] and may block.
pub trait DataSource: Send {
    /// Human-readable label used in log output.
    fn name(&self) -> &str;

    /// Perform one attempt at fetching the current list.
    ///
    /// Any error (transport, HTTP status, decoding) counts as one failed
    /// attempt; the caller decides whether to retry.
    fn fetch(&self) -> Result<Vec<Beer>>;
}
