//! Tracker credential storage in the OS keyring

use std::fmt;
#[cfg(test)]
use std::{collections::HashMap, sync::Mutex};

use tracing::debug;

/// Keyring service name all entries are filed under
pub const KEYRING_SERVICE: &str = "branch-clock";
/// Key of the tracker token entry
pub const TOKEN_KEY: &str = "tracker-token";

/// A secret string whose Debug output is redacted
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Process-external secret storage addressed by key
pub trait SecretStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Secret>, String>;
    fn save(&self, key: &str, secret: &Secret) -> Result<(), String>;
}

/// Secret store backed by the platform keyring
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, String> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| format!("Failed to open keyring entry {}: {}", key, e))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringStore {
    fn load(&self, key: &str) -> Result<Option<Secret>, String> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(Secret::new(value))),
            Err(keyring::Error::NoEntry) => {
                debug!("No keyring entry for {}", key);
                Ok(None)
            }
            Err(e) => Err(format!("Failed to read keyring entry {}: {}", key, e)),
        }
    }

    fn save(&self, key: &str, secret: &Secret) -> Result<(), String> {
        self.entry(key)?
            .set_password(secret.expose())
            .map_err(|e| format!("Failed to write keyring entry {}: {}", key, e))
    }
}

/// In-process secret store for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Secret>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl SecretStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Secret>, String> {
        self.entries
            .lock()
            .map(|entries| entries.get(key).cloned())
            .map_err(|e| format!("Failed to lock secret store: {}", e))
    }

    fn save(&self, key: &str, secret: &Secret) -> Result<(), String> {
        self.entries
            .lock()
            .map(|mut entries| {
                entries.insert(key.to_string(), secret.clone());
            })
            .map_err(|e| format!("Failed to lock secret store: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn memory_store_round_trips_by_key() {
        let store = MemoryStore::new();
        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);

        store.save(TOKEN_KEY, &Secret::new("abc")).unwrap();
        assert_eq!(store.load(TOKEN_KEY).unwrap(), Some(Secret::new("abc")));
        assert_eq!(store.load("other").unwrap(), None);
    }
}
