//! Configuration module
//!
//! CLI arguments for the daemon and the configure command, plus the typed
//! session settings loaded from disk and the keyring.

pub mod cli;
pub mod settings;

// Re-export main types
pub use cli::{Command, Config, ConfigureArgs, ServeArgs};
pub use settings::{settings_path, Settings, SettingsError, SettingsFile, TrackerSettings};
