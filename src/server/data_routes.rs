//! Variable, log and cron helper routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiResult;
use super::state::{GuardedEngine, ServerState};

#[derive(Debug, Deserialize)]
pub struct CronQuery {
    #[serde(default)]
    pub expr: String,
}

// =============================================================================
// Variables
// =============================================================================

async fn list_variables(State(engine): State<GuardedEngine>) -> impl IntoResponse {
    Json(engine.list_variables())
}

async fn get_variable(
    State(engine): State<GuardedEngine>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.get_variable(&name)?))
}

/// The body is either a JSON string or a `{value, separators}` object.
async fn put_variable(
    State(engine): State<GuardedEngine>,
    Path(name): Path<String>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.set_variable_json(&name, &body)?))
}

async fn delete_variable(
    State(engine): State<GuardedEngine>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    engine.delete_variable(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Logs
// =============================================================================

async fn get_task_logs(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.task_logs(&id)?))
}

async fn clear_task_logs(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    engine.clear_task_logs(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_execution_log(
    State(engine): State<GuardedEngine>,
    Path(log_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.execution_log(&log_id)?))
}

async fn clear_all_logs(State(engine): State<GuardedEngine>) -> ApiResult<impl IntoResponse> {
    engine.clear_all_logs()?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Cron
// =============================================================================

async fn describe_cron(
    State(engine): State<GuardedEngine>,
    Query(query): Query<CronQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.describe_cron(&query.expr)?))
}

pub fn make_data_routes(state: ServerState) -> Router {
    Router::new()
        .route("/variables", get(list_variables))
        .route(
            "/variables/{name}",
            get(get_variable).put(put_variable).delete(delete_variable),
        )
        .route("/tasks/{id}/logs", get(get_task_logs).delete(clear_task_logs))
        .route("/logs", delete(clear_all_logs))
        .route("/logs/{log_id}", get(get_execution_log))
        .route("/cron/describe", get(describe_cron))
        .with_state(state)
}
