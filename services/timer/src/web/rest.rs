//! services/timer/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::TimerError;
use crate::timer::{StartContext, TimerStatus, TimerView};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_timer_handler,
        pause_timer_handler,
        resume_timer_handler,
        stop_timer_handler,
        start_timer_handler,
    ),
    components(
        schemas(TimerView, TimerStatus, PauseRequest, StartRequest)
    ),
    tags(
        (name = "Work Timer API", description = "Countdown state and controls for the signed-in user's active task.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct PauseRequest {
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub project_id: String,
}

/// Maps a failed timer operation onto an HTTP status.
pub fn error_status(e: &TimerError) -> StatusCode {
    match e {
        TimerError::NoActiveTimer | TimerError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        TimerError::InvalidTransition(_) | TimerError::ConflictRetriesExhausted { .. } => {
            StatusCode::CONFLICT
        }
        TimerError::Port(_) => StatusCode::BAD_GATEWAY,
    }
}

fn json_result(result: Result<TimerView, TimerError>) -> Result<Json<TimerView>, (StatusCode, String)> {
    result
        .map(Json)
        .map_err(|e| (error_status(&e), e.to_string()))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Current countdown state.
#[utoipa::path(
    get,
    path = "/timer",
    responses(
        (status = 200, description = "Current timer state", body = TimerView)
    )
)]
pub async fn get_timer_handler(State(app_state): State<Arc<AppState>>) -> Json<TimerView> {
    Json(app_state.controller.view())
}

/// Pause the running timer.
#[utoipa::path(
    post,
    path = "/timer/pause",
    request_body = PauseRequest,
    responses(
        (status = 200, description = "Timer paused", body = TimerView),
        (status = 404, description = "No active timer"),
        (status = 409, description = "Timer is not running"),
        (status = 502, description = "Document store failure")
    )
)]
pub async fn pause_timer_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<PauseRequest>,
) -> Result<Json<TimerView>, (StatusCode, String)> {
    json_result(app_state.controller.pause(&req.reason).await)
}

/// Resume the paused timer.
#[utoipa::path(
    post,
    path = "/timer/resume",
    responses(
        (status = 200, description = "Timer resumed", body = TimerView),
        (status = 404, description = "No active timer"),
        (status = 409, description = "Timer is not paused"),
        (status = 502, description = "Document store failure")
    )
)]
pub async fn resume_timer_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<TimerView>, (StatusCode, String)> {
    json_result(app_state.controller.resume().await)
}

/// Stop the timer and complete the task.
#[utoipa::path(
    post,
    path = "/timer/stop",
    responses(
        (status = 200, description = "Timer stopped", body = TimerView),
        (status = 404, description = "No active timer"),
        (status = 409, description = "Task already completed"),
        (status = 502, description = "Document store failure")
    )
)]
pub async fn stop_timer_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<TimerView>, (StatusCode, String)> {
    json_result(app_state.controller.stop().await)
}

/// Accepted but not acted on: tasks are started by project management.
#[utoipa::path(
    post,
    path = "/timer/start",
    request_body = StartRequest,
    responses(
        (status = 202, description = "Acknowledged; the timer appears once the task is started", body = TimerView)
    )
)]
pub async fn start_timer_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<StartRequest>,
) -> impl IntoResponse {
    let view = app_state.controller.start(StartContext {
        project_id: req.project_id,
    });
    (StatusCode::ACCEPTED, Json(view))
}
