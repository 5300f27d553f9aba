//! beer-poller: a beer catalog service that polls itself, resiliently.
//!
//! ## Architecture overview
//!
//! ```text
//!                 POST/GET /beers
//!   clients ───────────────────────► server.rs ──► catalog/ (store + emitter)
//!                                       ▲
//!                                       │ GET /beers (HttpSource)
//!  ┌────────────┐  PollMsg   ┌──────────┴──┐
//!  │ report()   │ ◄───────── │   poll/     │  retry + circuit breaker +
//!  │ (tokio)    │  (channel) │  (thread)   │  empty-list fallback
//!  └────────────┘            └─────────────┘
//! ```
//!
//! * **`source/`**: the `Beer` record, the `DataSource` trait and the HTTP
//!   implementation.
//! * **`catalog/`**: append-only store and the slow, cancellable emitter.
//! * **`resilience/`**: backoff schedule and circuit breaker state machine.
//! * **`poll/`**: the `Poller` and the thread that runs it on a schedule.
//! * **`server`**: axum routes over the catalog.
//! * **`config/`**: YAML settings with `${VAR:default}` placeholders.
//! * **`main`**: wires everything together: parse args, load config, seed
//!   the catalog, start the poller, serve HTTP.

mod catalog;
mod config;
mod poll;
mod resilience;
mod server;
mod source;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catalog::Catalog;
use config::Settings;
use poll::{PollMsg, Poller, Schedule};
use source::{Beer, HttpSource};

#[derive(Debug, Parser)]
#[command(version, about = "Beer catalog service with a resilient poller")]
struct Args {
    /// YAML file merged over the built-in defaults.
    #[arg(short, long, env = "BEER_POLLER_CONFIG")]
    config: Option<PathBuf>,
}

/// What the catalog holds before anyone posts to it.
fn seed_beers() -> Vec<Beer> {
    vec![
        Beer::new(Some(1), "Luzerner Bier", "Brauerei Luzern AG"),
        Beer::new(Some(2), "Lozärner Bier", "Lozärner Bier AG"),
        Beer::new(Some(3), "Urbräu", "Tavolago AG"),
    ]
}

/// Log every poll outcome until the poller thread goes away.
async fn report(mut rx: mpsc::UnboundedReceiver<PollMsg>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            PollMsg::Items(beers) => {
                info!(count = beers.len(), "fetched beers");
                for beer in &beers {
                    info!(id = ?beer.id, name = %beer.name, brewery = %beer.brewery, "beer");
                }
            }
            PollMsg::Degraded(state) => {
                warn!(
                    circuit = ?state.circuit,
                    consecutive_failures = state.consecutive_failures,
                    last_attempt = ?state.last_attempt,
                    "poll degraded, using fallback"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // -- configuration (fatal on any missing or invalid value) ---------------
    let settings = Settings::load(args.config.as_deref()).context("failed to load configuration")?;
    let addr = settings.server.addr()?;

    // -- catalog -------------------------------------------------------------
    let catalog: Catalog = seed_beers().into_iter().collect();
    info!(count = catalog.len(), "catalog seeded");

    // -- background polling --------------------------------------------------
    // The blocking client is built here, outside the async runtime.
    let source = HttpSource::new(&settings.beers.url, "beers", settings.beers.request_timeout())?;
    let poller = Poller::from_settings(Box::new(source), &settings.beers);
    let rx = poll::spawn(poller, Schedule::from(&settings.beers));
    info!(
        url = %settings.beers.url,
        initial_delay = ?settings.beers.initial_delay,
        fixed_delay = ?settings.beers.fixed_delay,
        timeout = ?settings.beers.request_timeout(),
        "poller started"
    );

    // -- HTTP ----------------------------------------------------------------
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        tokio::spawn(report(rx));

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        server::serve(listener, server::router(catalog, settings.server.emit_delay))
            .await
            .context("server error")
    })
}
