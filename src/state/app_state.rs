//! Main application state management

use std::{
    sync::{Arc, Mutex, OnceLock},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    config::{Settings, TrackerSettings},
    coordinator::CoordinatorHandle,
    services::PromptBoard,
};
use super::{TimerSnapshot, WorkTimer};

/// Shared state: session settings, the work timer and the prompt board
#[derive(Debug)]
pub struct AppState {
    /// Settings loaded once at startup
    pub settings: Settings,
    /// The single work timer
    pub timer: Mutex<WorkTimer>,
    /// Pending confirmations and notices
    pub prompts: Arc<PromptBoard>,
    /// Set once the coordinator runs; absent while unconfigured
    pub coordinator: OnceLock<CoordinatorHandle>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<(String, DateTime<Utc>)>>,
    /// Channel for timer updates
    pub timer_update_tx: watch::Sender<TimerSnapshot>,
}

impl AppState {
    /// Create a new AppState with a stopped timer
    pub fn new(settings: Settings, prompts: Arc<PromptBoard>, port: u16, host: String) -> Self {
        let (timer_update_tx, _) = watch::channel(TimerSnapshot::default());

        Self {
            settings,
            timer: Mutex::new(WorkTimer::new()),
            prompts,
            coordinator: OnceLock::new(),
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            timer_update_tx,
        }
    }

    /// Tracker settings, if the session is configured
    pub fn tracker_settings(&self) -> Option<&TrackerSettings> {
        self.settings.tracker()
    }

    /// Hand the running coordinator to the HTTP layer
    pub fn attach_coordinator(&self, handle: CoordinatorHandle) -> Result<(), String> {
        self.coordinator
            .set(handle)
            .map_err(|_| "Coordinator already attached".to_string())
    }

    /// Coordinator handle, `None` when the session is unconfigured
    pub fn coordinator(&self) -> Option<&CoordinatorHandle> {
        self.coordinator.get()
    }

    /// Mutate the timer, record the action and publish the new snapshot
    pub fn update_timer<F, R>(&self, action: &str, updater: F) -> Result<R, String>
    where
        F: FnOnce(&mut WorkTimer) -> R,
    {
        let mut timer = self.timer.lock()
            .map_err(|e| format!("Failed to lock timer: {}", e))?;

        let result = updater(&mut timer);
        let snapshot = timer.snapshot();
        drop(timer); // Release the lock early

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some((action.to_string(), Utc::now()));
        }
        debug!("Timer {}: {}", action, snapshot.display());

        self.timer_update_tx.send_replace(snapshot);
        Ok(result)
    }

    /// Advance the running timer by one second
    pub fn tick(&self) -> Result<bool, String> {
        let mut timer = self.timer.lock()
            .map_err(|e| format!("Failed to lock timer: {}", e))?;

        if !timer.tick() {
            return Ok(false);
        }
        let snapshot = timer.snapshot();
        drop(timer);

        self.timer_update_tx.send_replace(snapshot);
        Ok(true)
    }

    /// Get current timer snapshot
    pub fn get_timer_snapshot(&self) -> Result<TimerSnapshot, String> {
        self.timer.lock()
            .map(|timer| timer.snapshot())
            .map_err(|e| format!("Failed to lock timer: {}", e))
    }

    /// Watch timer snapshots
    pub fn subscribe_timer(&self) -> watch::Receiver<TimerSnapshot> {
        self.timer_update_tx.subscribe()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock() {
            Ok(last) => match &*last {
                Some((action, at)) => (Some(action.clone()), Some(*at)),
                None => (None, None),
            },
            Err(e) => {
                warn!("Failed to lock last action: {}", e);
                (None, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskId;

    fn state() -> AppState {
        AppState::new(
            Settings::Unconfigured { reason: "test".to_string() },
            Arc::new(PromptBoard::new()),
            0,
            "127.0.0.1".to_string(),
        )
    }

    #[test]
    fn update_timer_publishes_snapshot_and_action() {
        let state = state();
        let rx = state.subscribe_timer();

        state
            .update_timer("start", |timer| {
                timer.set_task(TaskId::new("FOO-1"));
                timer.start()
            })
            .unwrap();

        let snapshot = rx.borrow().clone();
        assert!(snapshot.running);
        assert_eq!(snapshot.task, TaskId::new("FOO-1"));
        assert_eq!(state.get_last_action().0.as_deref(), Some("start"));
    }

    #[test]
    fn tick_only_moves_running_timer() {
        let state = state();
        assert!(!state.tick().unwrap());

        state.update_timer("start", |timer| timer.start()).unwrap();
        assert!(state.tick().unwrap());
        assert!(state.tick().unwrap());
        assert_eq!(state.get_timer_snapshot().unwrap().elapsed_seconds, 2);
        assert_eq!(state.subscribe_timer().borrow().elapsed_seconds, 2);
    }
}
