//! HTTP list source.
//!
//! Fetches a JSON array of [`Beer`] over HTTP with the blocking [`reqwest`]
//! client.  The body is decoded separately in [`HttpSource::parse_body`] so
//! that tests can exercise decoding without a server.

use std::time::Duration;

use anyhow::{Context, Result};

use super::{Beer, DataSource};

/// A remote endpoint that returns the whole catalog as one JSON array.
pub struct HttpSource {
    /// The list endpoint to poll.
    pub url: String,
    /// A short label used in log lines.
    pub label: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    /// Create a new HTTP source.
    ///
    /// # Arguments
    ///
    /// * `url`: full URL of the list endpoint (e.g.
    ///   `http://localhost:8080/beers`).
    /// * `label`: short name used when logging attempts against it.
    /// * `timeout`: limit for a whole request, body included.  `None` means
    ///   no limit, which is what a slowly streamed list needs.
    pub fn new(url: impl Into<String>, label: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        // reqwest's blocking client defaults to 30s; replace, don't inherit.
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            url: url.into(),
            label: label.into(),
            client,
        })
    }

    /// Decode a response body into [`Beer`]s.
    ///
    /// Pure function, no I/O.
    pub fn parse_body(body: &[u8]) -> Result<Vec<Beer>> {
        serde_json::from_slice(body).context("response body is not a JSON array of beers")
    }
}

impl DataSource for HttpSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch(&self) -> Result<Vec<Beer>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("GET {} failed", self.url))?
            .error_for_status()?
            .bytes()?;
        Self::parse_body(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
