//! Task HTTP routes.
//!
//! Provides endpoints for:
//! - Task CRUD and paginated listing
//! - Starting, stopping and probing runs
//! - Cron scheduling

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiResult;
use super::state::{GuardedEngine, ServerState};
use crate::task::TaskDraft;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStartedResponse {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTasksResponse {
    pub task_ids: Vec<String>,
}

// =============================================================================
// CRUD
// =============================================================================

async fn list_tasks(
    State(engine): State<GuardedEngine>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    Json(engine.list_tasks(query.page, query.page_size))
}

async fn create_task(
    State(engine): State<GuardedEngine>,
    Json(draft): Json<TaskDraft>,
) -> ApiResult<impl IntoResponse> {
    let task = engine.create_task(draft)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.get_task(&id)?))
}

async fn get_task_summary(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.task_summary(&id)?))
}

async fn update_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
    Json(draft): Json<TaskDraft>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.update_task(&id, draft)?))
}

async fn delete_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    engine.delete_task(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Runs
// =============================================================================

async fn run_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    // The run reports through progress and logs; the handle is not awaited.
    let _handle = engine.execute_task(&id)?;
    debug!("Run of {} accepted", id);
    Ok((StatusCode::ACCEPTED, Json(RunStartedResponse { task_id: id })))
}

async fn stop_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    engine.stop_task(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_progress(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    engine.get_task(&id)?;
    Ok(Json(engine.progress(&id)))
}

async fn test_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.test_task(&id).await?))
}

async fn test_draft(
    State(engine): State<GuardedEngine>,
    Json(draft): Json<TaskDraft>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.test_draft(draft).await?))
}

async fn preview_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.preview_task(&id)?))
}

// =============================================================================
// Scheduling
// =============================================================================

async fn get_schedule(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.schedule_info(&id)?))
}

async fn schedule_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.schedule_task(&id)?))
}

async fn unschedule_task(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    engine.unschedule_task(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_schedules(State(engine): State<GuardedEngine>) -> impl IntoResponse {
    Json(ScheduledTasksResponse {
        task_ids: engine.scheduled_tasks(),
    })
}

pub fn make_task_routes(state: ServerState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/test", post(test_draft))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/summary", get(get_task_summary))
        .route("/tasks/{id}/run", post(run_task))
        .route("/tasks/{id}/stop", post(stop_task))
        .route("/tasks/{id}/progress", get(get_progress))
        .route("/tasks/{id}/test", post(test_task))
        .route("/tasks/{id}/preview", get(preview_task))
        .route(
            "/tasks/{id}/schedule",
            get(get_schedule).post(schedule_task).delete(unschedule_task),
        )
        .route("/schedules", get(list_schedules))
        .with_state(state)
}
