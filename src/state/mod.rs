//! State management module
//!
//! This module contains the work timer and the shared application state.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use timer_state::{TaskId, TimerSnapshot, WorkTimer, NO_TASK_LABEL};
