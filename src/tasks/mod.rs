//! Background tasks module
//!
//! This module contains the timer ticker and the inactivity watchdog that
//! run alongside the HTTP server.

pub mod ticker;
pub mod watchdog;

// Re-export main items
pub use ticker::ticker_task;
pub use watchdog::Watchdog;
