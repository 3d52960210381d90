//! Branch Clock - a per-branch work timer that logs time to an issue tracker
//!
//! The daemon derives the current task from the git branch name, counts
//! working seconds against it and submits worklogs when the task changes,
//! when the user goes idle, or on request.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::{Config, Settings};
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
