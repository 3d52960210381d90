//! External collaborator module
//!
//! This module contains the boundaries to everything outside the timer:
//! git, the issue tracker, the credential store and the user prompt surface.

pub mod branch;
pub mod credentials;
pub mod prompt;
pub mod tracker;

// Re-export main types
pub use branch::{extract_task_id, BranchSource, GitBranchSource};
pub use credentials::{KeyringStore, Secret, SecretStore};
pub use prompt::{Confirmation, ConfirmationKind, NoticeLevel, PromptBoard, Prompter};
pub use tracker::{JiraClient, TrackerClient};
