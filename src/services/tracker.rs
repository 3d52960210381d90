//! Issue tracker client: credential probe and worklog submission

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{config::TrackerSettings, services::credentials::Secret, state::TaskId};

/// Comment used when the caller supplies none
pub const DEFAULT_COMMENT: &str = "Work on issue";
const COMMENT_PREFIX: &str = "branch-clock";

/// What the coordinator needs from the tracker. Implementations never
/// retry and never fail loudly: problems are logged and reported as `false`.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    async fn validate_credentials(&self) -> bool;
    async fn log_time(&self, task: &TaskId, minutes: u64, comment: Option<&str>) -> bool;
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
}

/// Worklog body as the tracker's REST API expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogRequest {
    pub started: String,
    pub time_spent_seconds: u64,
    pub comment: String,
}

impl WorklogRequest {
    /// Worklog ending at `now` truncated to the minute
    pub fn new(minutes: u64, comment: Option<&str>, now: DateTime<Utc>) -> Self {
        let time_spent_seconds = minutes.saturating_mul(60);
        let end = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        let start = end - chrono::Duration::seconds(time_spent_seconds as i64);
        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COMMENT);

        Self {
            started: start.format("%Y-%m-%dT%H:%M:%S%.3f+0000").to_string(),
            time_spent_seconds,
            comment: format!("{}: {}", COMMENT_PREFIX, comment),
        }
    }
}

/// Jira-compatible REST client using bearer token auth
#[derive(Debug, Clone)]
pub struct JiraClient {
    base_url: String,
    token: Secret,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn new(settings: &TrackerSettings, timeout: Duration) -> Self {
        Self::with_credentials(&settings.tracker_url, settings.credential.clone(), timeout)
    }

    pub fn with_credentials(base_url: &str, token: Secret, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    fn myself_url(&self) -> String {
        format!("{}/rest/api/2/myself", self.base_url)
    }

    fn worklog_url(&self, task: &TaskId) -> String {
        format!("{}/rest/api/2/issue/{}/worklog", self.base_url, task)
    }

    async fn check(url: String, result: reqwest::Result<reqwest::Response>) -> Result<(), TrackerError> {
        let response = result.map_err(|source| TrackerError::Transport {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Status { url, status, body })
    }

    /// GET the current user; any 2xx means the token works
    pub async fn probe(&self) -> Result<(), TrackerError> {
        let url = self.myself_url();
        debug!("Validating tracker credentials against {}", url);
        let result = self
            .client
            .get(&url)
            .bearer_auth(self.token.expose())
            .header("Content-Type", "application/json")
            .send()
            .await;
        Self::check(url, result).await
    }

    /// POST one worklog entry, single attempt
    pub async fn submit_worklog(
        &self,
        task: &TaskId,
        request: &WorklogRequest,
    ) -> Result<(), TrackerError> {
        let url = self.worklog_url(task);
        debug!(
            "Submitting worklog to {}: {}s starting {}",
            url, request.time_spent_seconds, request.started
        );
        let result = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose())
            .json(request)
            .send()
            .await;
        Self::check(url, result).await
    }
}

#[async_trait]
impl TrackerClient for JiraClient {
    async fn validate_credentials(&self) -> bool {
        match self.probe().await {
            Ok(()) => {
                info!("Tracker credentials are valid");
                true
            }
            Err(e) => {
                warn!("Tracker credential check failed: {}", e);
                false
            }
        }
    }

    async fn log_time(&self, task: &TaskId, minutes: u64, comment: Option<&str>) -> bool {
        let request = WorklogRequest::new(minutes, comment, Utc::now());
        match self.submit_worklog(task, &request).await {
            Ok(()) => {
                info!("Logged {} min to {}", minutes, task);
                true
            }
            Err(e) => {
                error!(
                    "Failed to log time: {} (task: {}, minutes: {}, comment: {})",
                    e, task, minutes, request.comment
                );
                false
            }
        }
    }
}
