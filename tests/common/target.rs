//! Local HTTP target that tasks send their requests to
//!
//! Records every hit so tests can assert on what the runner actually sent.

use super::constants::*;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    routing::{any, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// One request received by the target
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Default)]
struct TargetState {
    hits: Mutex<Vec<Hit>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Debug, Deserialize)]
struct SlowQuery {
    #[serde(default = "default_delay_ms")]
    ms: u64,
}

fn default_delay_ms() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
struct BigQuery {
    #[serde(default = "default_big_size")]
    size: usize,
}

fn default_big_size() -> usize {
    20_000
}

type Shared = Arc<TargetState>;

fn record(state: &TargetState, method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) {
    let hit = Hit {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(body).to_string(),
    };
    state.hits.lock().unwrap().push(hit);
}

async fn ok(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    record(&state, &method, &uri, &headers, &body);
    "ok"
}

async fn status(
    State(state): State<Shared>,
    Path(code): Path<u16>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    record(&state, &method, &uri, &headers, &body);
    let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, format!("status {}", code.as_u16()))
}

async fn json_body(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    record(&state, &method, &uri, &headers, &body);
    ([("content-type", "application/json")], JSON_BODY)
}

async fn echo(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    record(&state, &method, &uri, &headers, &body);
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({
        "method": method.to_string(),
        "path": uri.path(),
        "contentType": content_type,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn slow(
    State(state): State<Shared>,
    Query(query): Query<SlowQuery>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(query.ms)).await;
    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    record(&state, &method, &uri, &headers, &body);
    "slow"
}

async fn big(
    State(state): State<Shared>,
    Query(query): Query<BigQuery>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    record(&state, &method, &uri, &headers, &body);
    "a".repeat(query.size)
}

async fn redirect() -> impl IntoResponse {
    Redirect::temporary("/ok")
}

/// Target server bound to a random local port
///
/// Shuts down when dropped.
pub struct TargetServer {
    pub base_url: String,
    state: Shared,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TargetServer {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(TargetState::default());

        let app = Router::new()
            .route("/ok", any(ok))
            .route("/ok/{*rest}", any(ok))
            .route("/status/{code}", any(status))
            .route("/json", any(json_body))
            .route("/echo", any(echo))
            .route("/slow", any(slow))
            .route("/big", any(big))
            .route("/redirect", get(redirect))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind target server");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Target server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.state.hits.lock().unwrap().len()
    }

    /// Paths of every hit, sorted
    pub fn hit_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.hits().into_iter().map(|h| h.path).collect();
        paths.sort();
        paths
    }

    /// Highest number of `/slow` requests served at the same time
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for TargetServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
