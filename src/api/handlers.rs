//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    config::Settings,
    coordinator::{CoordinatorHandle, LogOutcome},
    services::prompt::{AnswerError, PendingPrompt},
    state::{AppState, TaskId, TimerSnapshot},
};
use super::responses::{
    AnswerRequest, ApiResponse, ErrorResponse, HealthResponse, LogRequest, LogResponse,
    SetTaskRequest, StatusResponse,
};

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

/// Coordinator handle, or 503 while the session is unconfigured
fn coordinator(state: &AppState) -> Result<&CoordinatorHandle, ApiError> {
    state.coordinator().ok_or_else(|| {
        let reason = match &state.settings {
            Settings::Unconfigured { reason } => reason.as_str(),
            Settings::Configured(_) => "coordinator not running",
        };
        warn!("Rejecting command, not configured: {}", reason);
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Not configured ({}). Run `branch-clock configure` and restart.", reason),
        )
    })
}

fn snapshot(state: &AppState) -> Result<TimerSnapshot, ApiError> {
    state.get_timer_snapshot().map_err(|e| {
        error!("Failed to get timer snapshot: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    })
}

fn queued(result: Result<(), String>) -> Result<(), ApiError> {
    result.map_err(|e| {
        error!("Failed to queue command: {}", e);
        api_error(StatusCode::SERVICE_UNAVAILABLE, e)
    })
}

/// Handle POST /activity - One user activity signal
pub async fn activity_handler(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    queued(coordinator(&state)?.activity())?;
    Ok(StatusCode::ACCEPTED)
}

/// Handle POST /timer/start - Start the work timer
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    queued(coordinator(&state)?.start())?;
    info!("Start endpoint called");
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::accepted("Start requested".to_string(), snapshot(&state)?))))
}

/// Handle POST /timer/pause - Pause the work timer
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    queued(coordinator(&state)?.pause())?;
    info!("Pause endpoint called");
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::accepted("Pause requested".to_string(), snapshot(&state)?))))
}

/// Handle POST /timer/reset - Reset the work timer
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    queued(coordinator(&state)?.reset())?;
    info!("Reset endpoint called");
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::accepted("Reset requested".to_string(), snapshot(&state)?))))
}

/// Handle PUT /task - Manually set the current task
pub async fn set_task_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetTaskRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let handle = coordinator(&state)?;
    let task = TaskId::new(&request.task)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Task identifier must not be empty"))?;

    queued(handle.set_task(task.clone()))?;
    info!("Task endpoint called - task set to {}", task);
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::accepted(format!("Task set to {}", task), snapshot(&state)?)),
    ))
}

/// Handle POST /log - Log the current task's time now
pub async fn log_handler(
    State(state): State<Arc<AppState>>,
    request: Option<Json<LogRequest>>,
) -> Result<(StatusCode, Json<LogResponse>), ApiError> {
    let handle = coordinator(&state)?;
    let comment = request.and_then(|Json(request)| request.comment);

    // The coordinator is blocked on the open confirmation
    if let Some(prompt) = state.prompts.pending() {
        warn!("Log requested while confirmation {} is pending", prompt.id);
        return Err(api_error(
            StatusCode::CONFLICT,
            format!("Confirmation {} is pending; answer it before logging", prompt.id),
        ));
    }

    let outcome = handle.log_now(comment).await.map_err(|e| {
        error!("Log request failed: {}", e);
        api_error(StatusCode::SERVICE_UNAVAILABLE, e)
    })?;

    let (status, message) = match &outcome {
        LogOutcome::Logged { task, minutes } => {
            (StatusCode::OK, format!("Logged {} min to {}", minutes, task))
        }
        LogOutcome::Failed { task, minutes } => (
            StatusCode::BAD_GATEWAY,
            format!("Failed to log {} min to {}; time kept for retry", minutes, task),
        ),
        LogOutcome::NoTask => (StatusCode::CONFLICT, "No current task".to_string()),
        LogOutcome::NothingToLog { elapsed_seconds } => (
            StatusCode::OK,
            format!("Only {}s elapsed, nothing to log", elapsed_seconds),
        ),
    };

    Ok((
        status,
        Json(LogResponse {
            message,
            outcome,
            timer: snapshot(&state)?,
        }),
    ))
}

/// Handle GET /prompt - Pending confirmation, if any
pub async fn prompt_handler(State(state): State<Arc<AppState>>) -> Json<Option<PendingPrompt>> {
    Json(state.prompts.pending())
}

/// Handle POST /prompt/:id/answer - Answer the pending confirmation
pub async fn answer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    match state.prompts.answer(id, request.confirm) {
        Ok(()) => Ok(Json(ApiResponse::ok(
            format!("Confirmation {} answered", id),
            snapshot(&state)?,
        ))),
        Err(e @ AnswerError::NoPending) => Err(api_error(StatusCode::NOT_FOUND, e.to_string())),
        Err(e @ AnswerError::Stale { .. }) => Err(api_error(StatusCode::CONFLICT, e.to_string())),
        Err(e @ AnswerError::Closed) => Err(api_error(StatusCode::GONE, e.to_string())),
    }
}

/// Handle GET /status - Return current status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let timer = snapshot(&state)?;
    let (last_action, last_action_time) = state.get_last_action();
    let unconfigured_reason = match &state.settings {
        Settings::Unconfigured { reason } => Some(reason.clone()),
        Settings::Configured(_) => None,
    };

    Ok(Json(StatusResponse {
        configured: state.coordinator().is_some(),
        unconfigured_reason,
        tracker_url: state.tracker_settings().map(|s| s.tracker_url.clone()),
        display: timer.display(),
        timer,
        pending_prompt: state.prompts.pending(),
        notices: state.prompts.notices(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
