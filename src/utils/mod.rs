//! Utility functions module
//!
//! Process-level helpers shared by the daemon entry point.

pub mod signals;

// Re-export main functions
pub use signals::shutdown_signal;
