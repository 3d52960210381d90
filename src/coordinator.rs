//! Activity/task coordinator
//!
//! A single task owns the watchdog and runs every protocol, so at most one
//! task-switch or inactivity sequence is in flight. Events that arrive while
//! a confirmation is pending are queued and replayed in arrival order, with
//! each run of consecutive activity signals coalesced into one.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    config::TrackerSettings,
    services::{
        extract_task_id, BranchSource, Confirmation, NoticeLevel, Prompter, TrackerClient,
    },
    state::{AppState, TaskId, TimerSnapshot, WorkTimer, NO_TASK_LABEL},
    tasks::Watchdog,
};

/// Input to the coordinator
#[derive(Debug)]
pub enum Event {
    /// The user did something
    Activity,
    /// The inactivity deadline with this generation elapsed
    WatchdogFired { generation: u64 },
    Start,
    Pause,
    Reset,
    /// Manual task override, no logging or reset
    SetTask(TaskId),
    /// Log the current task's time now
    LogNow {
        comment: Option<String>,
        reply: oneshot::Sender<LogOutcome>,
    },
}

/// Result of a manual log request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LogOutcome {
    Logged { task: TaskId, minutes: u64 },
    Failed { task: TaskId, minutes: u64 },
    NoTask,
    NothingToLog { elapsed_seconds: u64 },
}

/// Cloneable sender side used by the HTTP handlers
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    events: mpsc::UnboundedSender<Event>,
}

impl CoordinatorHandle {
    fn send(&self, event: Event) -> Result<(), String> {
        self.events
            .send(event)
            .map_err(|_| "Coordinator is not running".to_string())
    }

    pub fn activity(&self) -> Result<(), String> {
        self.send(Event::Activity)
    }

    pub fn start(&self) -> Result<(), String> {
        self.send(Event::Start)
    }

    pub fn pause(&self) -> Result<(), String> {
        self.send(Event::Pause)
    }

    pub fn reset(&self) -> Result<(), String> {
        self.send(Event::Reset)
    }

    pub fn set_task(&self, task: TaskId) -> Result<(), String> {
        self.send(Event::SetTask(task))
    }

    /// Queue a manual log and wait for its outcome
    pub async fn log_now(&self, comment: Option<String>) -> Result<LogOutcome, String> {
        let (reply, outcome) = oneshot::channel();
        self.send(Event::LogNow { comment, reply })?;
        outcome
            .await
            .map_err(|_| "Coordinator dropped the log request".to_string())
    }
}

pub struct Coordinator {
    state: Arc<AppState>,
    settings: TrackerSettings,
    branches: Arc<dyn BranchSource>,
    tracker: Arc<dyn TrackerClient>,
    prompter: Arc<dyn Prompter>,
    watchdog: Watchdog,
    events: mpsc::UnboundedReceiver<Event>,
}

impl Coordinator {
    pub fn new(
        state: Arc<AppState>,
        settings: TrackerSettings,
        branches: Arc<dyn BranchSource>,
        tracker: Arc<dyn TrackerClient>,
        prompter: Arc<dyn Prompter>,
    ) -> (Self, CoordinatorHandle) {
        let (tx, events) = mpsc::unbounded_channel();
        let watchdog = Watchdog::new(
            std::time::Duration::from_secs(settings.inactivity_timeout_secs),
            tx.clone(),
        );
        let coordinator = Self {
            state,
            settings,
            branches,
            tracker,
            prompter,
            watchdog,
            events,
        };
        (coordinator, CoordinatorHandle { events: tx })
    }

    /// Process events until the task is aborted.
    /// The watchdog keeps a sender, so the channel never closes on its own.
    pub async fn run(mut self) {
        info!("Starting coordinator");
        while let Some(event) = self.events.recv().await {
            if self.handle(event).await {
                self.drain_backlog().await;
            }
        }
        info!("Coordinator stopped");
    }

    /// Handle one event. Returns true when a protocol ran, meaning the
    /// backlog may hold signals that piled up meanwhile.
    async fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Activity => self.on_activity().await,
            Event::WatchdogFired { generation } => self.on_inactivity(generation).await,
            Event::Start => {
                self.start();
                false
            }
            Event::Pause => {
                self.pause();
                false
            }
            Event::Reset => {
                self.reset();
                false
            }
            Event::SetTask(task) => {
                self.set_task(task);
                false
            }
            Event::LogNow { comment, reply } => {
                let outcome = self.log_now(comment.as_deref()).await;
                if reply.send(outcome).is_err() {
                    debug!("Log requester went away before the outcome");
                }
                false
            }
        }
    }

    async fn drain_backlog(&mut self) {
        loop {
            let mut backlog = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                backlog.push(event);
            }
            if backlog.is_empty() {
                return;
            }

            // Arrival order is kept; a run of consecutive activity signals
            // collapses into one at the position of the run.
            let mut activity_run = 0usize;
            for event in backlog {
                if let Event::Activity = event {
                    activity_run += 1;
                    continue;
                }
                self.flush_activity(&mut activity_run).await;
                self.handle(event).await;
            }
            self.flush_activity(&mut activity_run).await;
        }
    }

    async fn flush_activity(&mut self, run: &mut usize) {
        if *run == 0 {
            return;
        }
        debug!("Coalesced {} queued activity signals", run);
        *run = 0;
        self.handle(Event::Activity).await;
    }

    fn update_timer<R>(&self, action: &str, updater: impl FnOnce(&mut WorkTimer) -> R) -> Option<R> {
        match self.state.update_timer(action, updater) {
            Ok(result) => Some(result),
            Err(e) => {
                error!("Timer {} failed: {}", action, e);
                None
            }
        }
    }

    fn snapshot(&self) -> TimerSnapshot {
        self.state.get_timer_snapshot().unwrap_or_else(|e| {
            error!("Failed to read timer: {}", e);
            TimerSnapshot::default()
        })
    }

    fn start(&mut self) {
        if self.update_timer("start", WorkTimer::start) == Some(true) {
            info!("Timer started");
        }
        if self.snapshot().running {
            self.watchdog.rearm();
        }
    }

    fn pause(&mut self) {
        if self.update_timer("pause", WorkTimer::pause) == Some(true) {
            info!("Timer paused");
        }
        self.watchdog.cancel();
    }

    fn reset(&mut self) {
        self.update_timer("reset", WorkTimer::reset);
        self.watchdog.cancel();
        info!("Timer reset");
    }

    fn set_task(&mut self, task: TaskId) {
        let previous = self.snapshot().task;
        info!(
            "Task set manually: {} -> {}",
            label(previous.as_ref()),
            task
        );
        self.prompter
            .notify(NoticeLevel::Info, format!("Task set to {}", task));
        self.update_timer("set-task", |timer| timer.set_task(Some(task)));
    }

    async fn on_activity(&mut self) -> bool {
        let snapshot = self.snapshot();
        if snapshot.running {
            self.watchdog.rearm();
        }

        let Some(branch) = self.branches.current_branch().await else {
            return false;
        };
        let Some(resolved) = extract_task_id(&branch) else {
            return false;
        };
        if snapshot.task.as_ref() == Some(&resolved) {
            return false;
        }

        self.switch_task(snapshot, resolved).await;
        true
    }

    /// Task-switch protocol: maybe log the previous task, then retarget
    async fn switch_task(&mut self, snapshot: TimerSnapshot, next: TaskId) {
        let minutes = snapshot.elapsed_seconds / 60;
        let threshold = self.settings.auto_log_threshold_minutes();
        info!(
            "Task switch detected: {} -> {} ({} min accrued)",
            label(snapshot.task.as_ref()),
            next,
            minutes
        );

        match snapshot.task {
            Some(previous) if minutes > 0 && minutes >= threshold => {
                let should_log = if self.settings.auto_log_enabled {
                    true
                } else {
                    self.prompter
                        .confirm(Confirmation::task_switch(format!(
                            "You switched to {}. Log {} min spent on {}?",
                            next, minutes, previous
                        )))
                        .await
                };
                if should_log {
                    self.log_and_report(&previous, minutes, None).await;
                } else {
                    info!("Declined logging {} min to {}", minutes, previous);
                }
            }
            Some(previous) => {
                debug!(
                    "Not logging {} min to {}: below {} min threshold",
                    minutes, previous, threshold
                );
            }
            None => debug!("No previous task, nothing to log"),
        }

        self.update_timer("switch-task", |timer| {
            timer.reset();
            timer.set_task(Some(next));
            timer.start();
        });
        self.watchdog.rearm();
    }

    /// Inactivity protocol, run when the live watchdog deadline fires
    async fn on_inactivity(&mut self, generation: u64) -> bool {
        if !self.watchdog.accept_fire(generation) {
            return false;
        }

        let snapshot = self.snapshot();
        if !snapshot.running {
            debug!("Inactivity deadline reached while paused, ignoring");
            return false;
        }
        let Some(task) = snapshot.task else {
            debug!("Inactivity deadline reached without a task, nothing to log");
            return false;
        };

        let idle_secs = self.watchdog.threshold().as_secs();
        let overrun = snapshot.elapsed_seconds.saturating_sub(idle_secs);
        let minutes = overrun / 60;
        if overrun <= self.settings.auto_log_threshold_secs || minutes == 0 {
            debug!(
                "Idle with {}s worked on {}, below logging threshold; still counting",
                overrun, task
            );
            return false;
        }

        info!(
            "Inactive for more than {} min, {} min worked on {}",
            idle_secs / 60,
            minutes,
            task
        );
        self.update_timer("idle-pause", WorkTimer::pause);

        let confirmed = self
            .prompter
            .confirm(Confirmation::inactivity(format!(
                "You were inactive for more than {} min. Log {} min to {}?",
                idle_secs / 60,
                minutes,
                task
            )))
            .await;

        if confirmed {
            if self.log_and_report(&task, minutes, None).await {
                self.update_timer("idle-log", WorkTimer::reset);
            } else {
                warn!("Keeping {}s on {} after failed log", snapshot.elapsed_seconds, task);
            }
        }

        // Tracking never stays paused after an inactivity prompt
        self.update_timer("idle-resume", WorkTimer::start);
        self.watchdog.rearm();
        true
    }

    /// Manual log-now for the current task
    async fn log_now(&mut self, comment: Option<&str>) -> LogOutcome {
        let snapshot = self.snapshot();
        let Some(task) = snapshot.task else {
            self.prompter.notify(
                NoticeLevel::Warning,
                "No task recognized; set one before logging".to_string(),
            );
            return LogOutcome::NoTask;
        };

        let minutes = snapshot.elapsed_seconds / 60;
        if minutes == 0 {
            self.prompter.notify(
                NoticeLevel::Info,
                format!("Less than a minute on {}, nothing to log", task),
            );
            return LogOutcome::NothingToLog {
                elapsed_seconds: snapshot.elapsed_seconds,
            };
        }

        if self.log_and_report(&task, minutes, comment).await {
            self.update_timer("log-now", |timer| {
                let was_running = timer.is_running();
                timer.reset();
                if was_running {
                    timer.start();
                }
            });
            LogOutcome::Logged { task, minutes }
        } else {
            LogOutcome::Failed { task, minutes }
        }
    }

    async fn log_and_report(&self, task: &TaskId, minutes: u64, comment: Option<&str>) -> bool {
        let logged = self.tracker.log_time(task, minutes, comment).await;
        if logged {
            self.prompter.notify(
                NoticeLevel::Info,
                format!("Logged {} min to {}", minutes, task),
            );
        } else {
            self.prompter.notify(
                NoticeLevel::Error,
                format!("Failed to log {} min to {}", minutes, task),
            );
        }
        logged
    }
}

fn label(task: Option<&TaskId>) -> &str {
    task.map(TaskId::as_str).unwrap_or(NO_TASK_LABEL)
}
