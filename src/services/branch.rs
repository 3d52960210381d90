//! Git branch lookup and branch-name to task resolution

use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::state::TaskId;

/// Uppercase project key, underscore, issue number
const TASK_PATTERN: &str = "[A-Z]+_[0-9]+";

fn task_regex() -> &'static Regex {
    static TASK_REGEX: OnceLock<Regex> = OnceLock::new();
    TASK_REGEX.get_or_init(|| Regex::new(TASK_PATTERN).expect("task pattern is a valid regex"))
}

/// Extract the task id embedded in a branch name.
///
/// `feature/FOO_123-desc` resolves to `FOO-123`. The first match wins.
/// Lowercase project keys are not recognized.
pub fn extract_task_id(branch_name: &str) -> Option<TaskId> {
    task_regex()
        .find(branch_name)
        .and_then(|m| TaskId::new(m.as_str().replace('_', "-")))
}

/// Source of the current branch name
#[async_trait]
pub trait BranchSource: Send + Sync {
    /// Current branch, or `None` when it cannot be determined
    async fn current_branch(&self) -> Option<String>;
}

/// Reads the branch with `git branch --show-current`
#[derive(Debug)]
pub struct GitBranchSource {
    repo: PathBuf,
    cache_ttl: Duration,
    cache: Mutex<Option<(Instant, Option<String>)>>,
}

impl GitBranchSource {
    pub fn new(repo: PathBuf, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<Option<String>> {
        let cache = self.cache.lock().ok()?;
        match &*cache {
            Some((at, branch)) if at.elapsed() < self.cache_ttl => Some(branch.clone()),
            _ => None,
        }
    }

    fn store(&self, branch: Option<String>) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some((Instant::now(), branch));
        }
    }

    async fn query_git(&self) -> Result<Option<String>, String> {
        let output = Command::new("git")
            .args(["branch", "--show-current"])
            .current_dir(&self.repo)
            .output()
            .await
            .map_err(|e| format!("Failed to execute git: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git branch failed: {}", stderr.trim()));
        }

        // Detached HEAD prints nothing
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if branch.is_empty() { None } else { Some(branch) })
    }
}

#[async_trait]
impl BranchSource for GitBranchSource {
    async fn current_branch(&self) -> Option<String> {
        if let Some(branch) = self.cached() {
            return branch;
        }

        let branch = match self.query_git().await {
            Ok(branch) => branch,
            Err(e) => {
                debug!("Branch lookup in {} failed: {}", self.repo.display(), e);
                None
            }
        };
        self.store(branch.clone());
        branch
    }
}
