use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use super::data_routes::make_data_routes;
use super::task_routes::make_task_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::metrics::metrics_handler;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
    pub task_count: usize,
    pub scheduled_count: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
        task_count: state.engine.list_tasks(1, 1).total,
        scheduled_count: state.engine.scheduled_tasks().len(),
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig, engine: GuardedEngine) -> Router {
    let state = ServerState::new(config, engine);

    let api_routes: Router = make_task_routes(state.clone()).merge(make_data_routes(state.clone()));

    let home_router: Router = Router::new()
        .route("/", get(home))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone());

    home_router
        .nest("/v1", api_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

/// Serves the API until `shutdown` resolves.
pub async fn run_server<F>(config: ServerConfig, engine: GuardedEngine, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = format!("{}:{}", config.bind_address, config.port);
    let app = make_app(config, engine);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}
