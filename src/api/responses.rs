//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    coordinator::LogOutcome,
    services::prompt::{Notice, PendingPrompt},
    state::TimerSnapshot,
};

/// Response for timer commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerSnapshot,
    pub display: String,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, timer: TimerSnapshot) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            display: timer.display(),
            timer,
        }
    }

    /// Command queued for the coordinator
    pub fn accepted(message: String, timer: TimerSnapshot) -> Self {
        Self::new("accepted", message, timer)
    }

    /// Command completed
    pub fn ok(message: String, timer: TimerSnapshot) -> Self {
        Self::new("ok", message, timer)
    }
}

/// Error body for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Response for POST /log
#[derive(Debug, Clone, Serialize)]
pub struct LogResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: LogOutcome,
    pub timer: TimerSnapshot,
}

/// Body of POST /log
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogRequest {
    pub comment: Option<String>,
}

/// Body of PUT /task
#[derive(Debug, Clone, Deserialize)]
pub struct SetTaskRequest {
    pub task: String,
}

/// Body of POST /prompt/:id/answer
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub confirm: bool,
}

/// Full status with timer, prompt and notices
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unconfigured_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_url: Option<String>,
    pub timer: TimerSnapshot,
    pub display: String,
    pub pending_prompt: Option<PendingPrompt>,
    pub notices: Vec<Notice>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
