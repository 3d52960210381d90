//! Tracker settings: file layout, credential lookup and eager validation
//!
//! Resolution order for the settings file path:
//! 1. Explicit `--settings` argument (or `BRANCH_CLOCK_SETTINGS`)
//! 2. `$XDG_CONFIG_HOME/branch-clock/settings.json`
//! 3. `$HOME/.config/branch-clock/settings.json`

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::credentials::{Secret, SecretStore, TOKEN_KEY};

const APP_DIR: &str = "branch-clock";
const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot locate a config directory: neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("credential store error: {0}")]
    Credential(String),
}

/// On-disk settings. The credential never appears here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_url: Option<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactivity_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_logging: Option<bool>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_logging_time: Option<u64>,
}

impl SettingsFile {
    /// Read the file; a missing file is `Ok(None)`
    pub fn read(path: &Path) -> Result<Option<Self>, SettingsError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Write the file, creating parent directories
    pub fn write(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let body = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, body).map_err(write_err)
    }
}

/// Validated settings for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub tracker_url: String,
    pub credential: Secret,
    pub inactivity_timeout_secs: u64,
    pub auto_log_enabled: bool,
    pub auto_log_threshold_secs: u64,
}

impl TrackerSettings {
    /// Validate file contents plus credential. Falsy required fields are missing.
    pub fn from_parts(file: &SettingsFile, credential: Option<Secret>) -> Result<Self, SettingsError> {
        let tracker_url = file
            .tracker_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::Missing("trackerUrl"))?
            .to_string();
        let credential = credential
            .filter(|secret| !secret.is_empty())
            .ok_or(SettingsError::Missing("credential"))?;
        let inactivity_timeout_secs = file
            .inactivity_timeout
            .filter(|secs| *secs > 0)
            .ok_or(SettingsError::Missing("inactivityTimeout"))?;
        let auto_log_threshold_secs = file
            .auto_logging_time
            .ok_or(SettingsError::Missing("autoLoggingTime"))?;

        Ok(Self {
            tracker_url,
            credential,
            inactivity_timeout_secs,
            auto_log_enabled: file.auto_logging.unwrap_or(false),
            auto_log_threshold_secs,
        })
    }

    /// Threshold below which a task switch skips logging
    pub fn auto_log_threshold_minutes(&self) -> u64 {
        self.auto_log_threshold_secs / 60
    }

    /// File form of these settings, without the credential
    pub fn to_file(&self) -> SettingsFile {
        SettingsFile {
            tracker_url: Some(self.tracker_url.clone()),
            inactivity_timeout: Some(self.inactivity_timeout_secs),
            auto_logging: Some(self.auto_log_enabled),
            auto_logging_time: Some(self.auto_log_threshold_secs),
        }
    }
}

/// Session settings: either fully configured or explicitly not
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settings {
    Configured(TrackerSettings),
    Unconfigured { reason: String },
}

impl Settings {
    /// Load settings once for the session. Any problem yields `Unconfigured`.
    pub fn load(
        path: &Path,
        store: &dyn SecretStore,
        credential_override: Option<Secret>,
    ) -> Self {
        match Self::try_load(path, store, credential_override) {
            Ok(settings) => Settings::Configured(settings),
            Err(e) => {
                warn!("Settings unavailable: {}", e);
                Settings::Unconfigured {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_load(
        path: &Path,
        store: &dyn SecretStore,
        credential_override: Option<Secret>,
    ) -> Result<TrackerSettings, SettingsError> {
        debug!("Loading settings from {}", path.display());
        let file = SettingsFile::read(path)?.ok_or(SettingsError::Missing("settings file"))?;
        let credential = match credential_override.filter(|secret| !secret.is_empty()) {
            Some(secret) => Some(secret),
            None => store.load(TOKEN_KEY).map_err(SettingsError::Credential)?,
        };
        TrackerSettings::from_parts(&file, credential)
    }

    pub fn tracker(&self) -> Option<&TrackerSettings> {
        match self {
            Settings::Configured(settings) => Some(settings),
            Settings::Unconfigured { .. } => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.tracker().is_some()
    }
}

/// Resolve the settings file path
pub fn settings_path(explicit: Option<&Path>) -> Result<PathBuf, SettingsError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let xdg = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty());
    let home = std::env::var_os("HOME").filter(|v| !v.is_empty());
    resolve_settings_path(xdg.map(PathBuf::from), home.map(PathBuf::from))
}

fn resolve_settings_path(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, SettingsError> {
    let base = match (xdg_config_home, home) {
        (Some(xdg), _) => xdg,
        (None, Some(home)) => home.join(".config"),
        (None, None) => return Err(SettingsError::NoConfigDir),
    };
    Ok(base.join(APP_DIR).join(SETTINGS_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::credentials::MemoryStore;
    use tempfile::TempDir;

    fn complete_file() -> SettingsFile {
        SettingsFile {
            tracker_url: Some("https://jira.example.com/".to_string()),
            inactivity_timeout: Some(600),
            auto_logging: Some(false),
            auto_logging_time: Some(300),
        }
    }

    #[test]
    fn complete_file_and_credential_validate() {
        let settings =
            TrackerSettings::from_parts(&complete_file(), Some(Secret::new("token"))).unwrap();
        assert_eq!(settings.tracker_url, "https://jira.example.com");
        assert_eq!(settings.inactivity_timeout_secs, 600);
        assert!(!settings.auto_log_enabled);
        assert_eq!(settings.auto_log_threshold_minutes(), 5);
    }

    #[test]
    fn falsy_required_fields_are_missing() {
        let mut file = complete_file();
        file.tracker_url = Some("  ".to_string());
        assert!(matches!(
            TrackerSettings::from_parts(&file, Some(Secret::new("t"))),
            Err(SettingsError::Missing("trackerUrl"))
        ));

        let mut file = complete_file();
        file.inactivity_timeout = Some(0);
        assert!(matches!(
            TrackerSettings::from_parts(&file, Some(Secret::new("t"))),
            Err(SettingsError::Missing("inactivityTimeout"))
        ));

        assert!(matches!(
            TrackerSettings::from_parts(&complete_file(), Some(Secret::new(""))),
            Err(SettingsError::Missing("credential"))
        ));
        assert!(matches!(
            TrackerSettings::from_parts(&complete_file(), None),
            Err(SettingsError::Missing("credential"))
        ));
    }

    #[test]
    fn disabled_auto_logging_is_not_missing() {
        let mut file = complete_file();
        file.auto_logging = None;
        let settings = TrackerSettings::from_parts(&file, Some(Secret::new("t"))).unwrap();
        assert!(!settings.auto_log_enabled);
    }

    #[test]
    fn load_reads_file_and_keyring_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);
        complete_file().write(&path).unwrap();

        let store = MemoryStore::new();
        store.save(TOKEN_KEY, &Secret::new("from-keyring")).unwrap();

        let settings = Settings::load(&path, &store, None);
        let tracker = settings.tracker().expect("configured");
        assert_eq!(tracker.credential.expose(), "from-keyring");

        let overridden = Settings::load(&path, &store, Some(Secret::new("from-env")));
        assert_eq!(
            overridden.tracker().unwrap().credential.expose(),
            "from-env"
        );
    }

    #[test]
    fn missing_file_or_token_is_unconfigured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        let store = MemoryStore::new();

        let settings = Settings::load(&path, &store, None);
        assert!(!settings.is_configured());

        complete_file().write(&path).unwrap();
        match Settings::load(&path, &store, None) {
            Settings::Unconfigured { reason } => assert!(reason.contains("credential")),
            other => panic!("expected unconfigured, got {:?}", other),
        }
    }

    #[test]
    fn malformed_file_is_unconfigured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SettingsFile::read(&path),
            Err(SettingsError::Parse { .. })
        ));
        assert!(!Settings::load(&path, &MemoryStore::new(), Some(Secret::new("t"))).is_configured());
    }

    #[test]
    fn file_uses_camel_case_keys_without_credential() {
        let settings =
            TrackerSettings::from_parts(&complete_file(), Some(Secret::new("token"))).unwrap();
        let json = serde_json::to_value(settings.to_file()).unwrap();
        assert_eq!(json["trackerUrl"], "https://jira.example.com");
        assert_eq!(json["autoLoggingTime"], 300);
        assert!(!json.to_string().contains("token"));
    }

    #[test]
    fn path_resolution_prefers_xdg_then_home() {
        let xdg = resolve_settings_path(Some(PathBuf::from("/x")), Some(PathBuf::from("/h")));
        assert_eq!(xdg.unwrap(), PathBuf::from("/x/branch-clock/settings.json"));

        let home = resolve_settings_path(None, Some(PathBuf::from("/h")));
        assert_eq!(
            home.unwrap(),
            PathBuf::from("/h/.config/branch-clock/settings.json")
        );

        assert!(matches!(
            resolve_settings_path(None, None),
            Err(SettingsError::NoConfigDir)
        ));
        assert_eq!(
            settings_path(Some(Path::new("/explicit.json"))).unwrap(),
            PathBuf::from("/explicit.json")
        );
    }
}
