//! HTTP surface over the [`Catalog`].
//!
//! * `GET /beers` streams the catalog as a JSON array, one element per
//!   emitter tick.  A client that hangs up cancels the emission.
//! * `POST /beers` appends one beer and answers `204 No Content`.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::catalog::{Catalog, Emitter, Signal};
use crate::source::Beer;

#[derive(Clone)]
struct AppState {
    catalog: Catalog,
    emit_delay: Duration,
}

pub fn router(catalog: Catalog, emit_delay: Duration) -> Router {
    Router::new()
        .route("/beers", get(list_beers).post(add_beer))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { catalog, emit_delay })
}

/// Serve `router` on `listener` until the process is stopped.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router).await
}

async fn list_beers(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.catalog.list();
    debug!(count = snapshot.len(), "streaming catalog");

    let emitter = Emitter::new(snapshot, state.emit_delay);
    let handle = emitter.handle();
    let signals = emitter.into_stream().inspect(move |signal| {
        if *signal == Signal::Complete {
            debug!(produced = handle.produced(), "catalog stream complete");
        }
    });
    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(json_array(signals)),
    )
}

async fn add_beer(State(state): State<AppState>, Json(beer): Json<Beer>) -> StatusCode {
    debug!(id = ?beer.id, name = %beer.name, "adding beer");
    state.catalog.append(beer);
    StatusCode::NO_CONTENT
}

/// Frame emitted items as the chunks of one JSON array.
fn json_array(
    signals: impl Stream<Item = Signal> + Send + 'static,
) -> impl Stream<Item = Result<Bytes, serde_json::Error>> + Send + 'static {
    signals.scan(true, |first, signal| {
        let chunk = match signal {
            Signal::Item(beer) => {
                let open = if *first { b'[' } else { b',' };
                serde_json::to_vec(&beer).map(|json| {
                    let mut chunk = Vec::with_capacity(json.len() + 1);
                    chunk.push(open);
                    chunk.extend_from_slice(&json);
                    Bytes::from(chunk)
                })
            }
            Signal::Complete if *first => Ok(Bytes::from_static(b"[]")),
            Signal::Complete => Ok(Bytes::from_static(b"]")),
        };
        *first = false;
        futures::future::ready(Some(chunk))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::Poller;
    use crate::resilience::{Backoff, CircuitBreaker, CircuitState};
    use crate::source::{DataSource, HttpSource};
    use axum::http::Request;
    use futures::stream;
    use tower::ServiceExt;

    fn sample_beers() -> Vec<Beer> {
        vec![
            Beer::new(Some(1), "Luzerner Bier", "Brauerei Luzern AG"),
            Beer::new(Some(2), "Lozärner Bier", "Lozärner Bier AG"),
            Beer::new(Some(3), "Urbräu", "Tavolago AG"),
        ]
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(json: &str) -> Request<Body> {
        Request::post("/beers")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn get_streams_catalog_in_order() {
        let catalog: Catalog = sample_beers().into_iter().collect();
        let app = router(catalog, Duration::ZERO);

        let response = app
            .oneshot(Request::get("/beers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_json(response).await, serde_json::to_value(sample_beers()).unwrap());
    }

    #[tokio::test]
    async fn get_on_empty_catalog_is_empty_array() {
        let app = router(Catalog::default(), Duration::ZERO);

        let response = app
            .oneshot(Request::get("/beers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn post_appends_and_returns_no_content() {
        let catalog = Catalog::default();
        let app = router(catalog.clone(), Duration::ZERO);

        for beer in sample_beers() {
            let response = app
                .clone()
                .oneshot(post(&serde_json::to_string(&beer).unwrap()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        assert_eq!(*catalog.list(), sample_beers());
    }

    #[tokio::test]
    async fn post_accepts_null_id() {
        let catalog = Catalog::default();
        let app = router(catalog.clone(), Duration::ZERO);

        let response = app
            .oneshot(post(r#"{"id":null,"name":"Urbräu","brewery":"Tavolago AG"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(catalog.list()[0].id, None);
    }

    #[tokio::test]
    async fn post_rejects_structurally_invalid_body() {
        let catalog = Catalog::default();
        let app = router(catalog.clone(), Duration::ZERO);

        let missing_field = app.clone().oneshot(post(r#"{"id":1}"#)).await.unwrap();
        let not_json = app.oneshot(post("beer please")).await.unwrap();

        assert!(missing_field.status().is_client_error());
        assert!(not_json.status().is_client_error());
        assert_eq!(catalog.len(), 0);
    }

    #[tokio::test]
    async fn json_array_frames_items() {
        let signals = stream::iter(vec![
            Signal::Item(Beer::new(Some(1), "A", "B")),
            Signal::Item(Beer::new(None, "C", "D")),
            Signal::Complete,
        ]);

        let chunks: Vec<Bytes> = json_array(signals).map(|chunk| chunk.unwrap()).collect().await;
        let text: String = chunks.iter().map(|c| String::from_utf8_lossy(c).into_owned()).collect();

        assert_eq!(chunks.len(), 3, "one chunk per signal");
        assert_eq!(
            text,
            r#"[{"id":1,"name":"A","brewery":"B"},{"id":null,"name":"C","brewery":"D"}]"#
        );
    }

    /// Full round trip: real listener, blocking HTTP source, resilient poller.
    #[tokio::test(flavor = "multi_thread")]
    async fn poller_reads_what_the_server_serves() {
        let catalog = Catalog::default();
        for beer in sample_beers() {
            catalog.append(beer);
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/beers", listener.local_addr().unwrap());
        tokio::spawn(serve(listener, router(catalog, Duration::from_millis(5))));

        let (beers, state) = tokio::task::spawn_blocking(move || {
            let source = HttpSource::new(url, "local", None).unwrap();
            assert_eq!(source.fetch().unwrap(), sample_beers());

            let mut poller = Poller::new(
                Box::new(source),
                crate::poll::RetryPolicy {
                    attempts: 3,
                    backoff: Backoff::fixed(Duration::ZERO),
                },
                CircuitBreaker::new(5, Duration::from_secs(600)),
                Backoff::fixed(Duration::ZERO),
            );
            (poller.fetch(), poller.state())
        })
        .await
        .unwrap();

        assert_eq!(beers, sample_beers());
        assert_eq!(state.circuit, CircuitState::Closed);
        assert_eq!(state.consecutive_failures, 0);
    }

    /// A streamed list takes `emit_delay` per item; only the request
    /// timeout, not the size of the catalog, decides whether it fits.
    #[tokio::test(flavor = "multi_thread")]
    async fn slow_stream_is_read_to_the_end_without_a_timeout() {
        let catalog: Catalog = (0..6)
            .map(|i| Beer::new(Some(i), format!("Bier {i}"), "Brauerei"))
            .collect();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/beers", listener.local_addr().unwrap());
        tokio::spawn(serve(listener, router(catalog.clone(), Duration::from_millis(50))));

        let (unlimited, limited) = tokio::task::spawn_blocking(move || {
            let unlimited = HttpSource::new(url.clone(), "local", None).unwrap().fetch();
            let limited = HttpSource::new(url, "local", Some(Duration::from_millis(120)))
                .unwrap()
                .fetch();
            (unlimited, limited)
        })
        .await
        .unwrap();

        assert_eq!(unlimited.unwrap(), *catalog.list());
        assert!(limited.is_err(), "body read must count against the request timeout");
    }
}
