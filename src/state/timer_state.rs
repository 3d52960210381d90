//! Work timer and the task identifier it accrues time against

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized issue-tracker identifier such as `PROJECT-123`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Build a task id from free text; blank input is rejected
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label used wherever "no task" has to be rendered
pub const NO_TASK_LABEL: &str = "None";

/// Stopwatch counting whole seconds while running
#[derive(Debug, Clone, Default)]
pub struct WorkTimer {
    elapsed_seconds: u64,
    running: bool,
    task: Option<TaskId>,
}

impl WorkTimer {
    /// Create a stopped timer with no task
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting. Returns false when it was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Stop counting. Returns false when it was already stopped.
    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    /// Pause and zero the counter; the task is kept
    pub fn reset(&mut self) {
        self.pause();
        self.elapsed_seconds = 0;
    }

    /// Retarget the timer. Elapsed time and running state are untouched.
    pub fn set_task(&mut self, task: Option<TaskId>) {
        self.task = task;
    }

    /// Advance one second if running. Returns whether the counter moved.
    pub fn tick(&mut self) -> bool {
        if self.running {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        }
        self.running
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn task(&self) -> Option<&TaskId> {
        self.task.as_ref()
    }

    /// Immutable copy for presentation layers
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            elapsed_seconds: self.elapsed_seconds,
            running: self.running,
            task: self.task.clone(),
        }
    }
}

/// Point-in-time view of the work timer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub elapsed_seconds: u64,
    pub running: bool,
    pub task: Option<TaskId>,
}

impl TimerSnapshot {
    /// Status line text, e.g. `01:02:03 | Task: FOO-1`
    pub fn display(&self) -> String {
        let hours = self.elapsed_seconds / 3600;
        let minutes = (self.elapsed_seconds % 3600) / 60;
        let seconds = self.elapsed_seconds % 60;
        let task = self
            .task
            .as_ref()
            .map(TaskId::as_str)
            .unwrap_or(NO_TASK_LABEL);
        format!("{:02}:{:02}:{:02} | Task: {}", hours, minutes, seconds, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(raw: &str) -> TaskId {
        TaskId::new(raw).unwrap()
    }

    #[test]
    fn new_timer_is_stopped_at_zero_without_task() {
        let timer = WorkTimer::new();
        assert_eq!(timer.elapsed(), 0);
        assert!(!timer.is_running());
        assert!(timer.task().is_none());
    }

    #[test]
    fn ticks_only_count_while_running() {
        let mut timer = WorkTimer::new();
        assert!(!timer.tick());
        assert_eq!(timer.elapsed(), 0);

        timer.start();
        timer.tick();
        timer.tick();
        assert_eq!(timer.elapsed(), 2);

        timer.pause();
        timer.tick();
        assert_eq!(timer.elapsed(), 2);
    }

    #[test]
    fn start_and_pause_are_idempotent() {
        let mut timer = WorkTimer::new();
        assert!(timer.start());
        assert!(!timer.start());
        timer.tick();
        assert_eq!(timer.elapsed(), 1);

        assert!(timer.pause());
        assert!(!timer.pause());
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(), 1);
    }

    #[test]
    fn reset_zeroes_and_stops_but_keeps_task() {
        let mut timer = WorkTimer::new();
        timer.set_task(Some(task("FOO-1")));
        timer.start();
        for _ in 0..42 {
            timer.tick();
        }
        timer.reset();
        assert_eq!(timer.elapsed(), 0);
        assert!(!timer.is_running());
        assert_eq!(timer.task(), Some(&task("FOO-1")));
    }

    #[test]
    fn set_task_leaves_clock_alone() {
        let mut timer = WorkTimer::new();
        timer.start();
        timer.tick();
        timer.set_task(Some(task("BAR-9")));
        assert_eq!(timer.elapsed(), 1);
        assert!(timer.is_running());
        assert_eq!(timer.task().map(TaskId::as_str), Some("BAR-9"));
    }

    #[test]
    fn task_id_rejects_blank_input_and_trims() {
        assert!(TaskId::new("").is_none());
        assert!(TaskId::new("   ").is_none());
        assert_eq!(TaskId::new("  ABC-1 ").unwrap().as_str(), "ABC-1");
    }

    #[test]
    fn display_formats_hours_minutes_seconds() {
        let snapshot = TimerSnapshot {
            elapsed_seconds: 3723,
            running: true,
            task: Some(task("FOO-1")),
        };
        assert_eq!(snapshot.display(), "01:02:03 | Task: FOO-1");

        let idle = TimerSnapshot::default();
        assert_eq!(idle.display(), "00:00:00 | Task: None");
    }
}
