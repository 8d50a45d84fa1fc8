use serde::{Deserialize, Serialize};

/// Top-level settings container, persisted as `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SyncSettings {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub sync: DrainSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSettings {
    /// Base URL of the hosted backend, e.g. `https://project.example.co`.
    pub base_url: String,
    /// Public API key sent alongside the session token.
    pub api_key: String,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            request_timeout_secs: 15,
        }
    }
}

/// Queue replay settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrainSettings {
    /// Seconds between background drain passes.
    pub drain_interval_secs: u64,
    /// Failed replays after which an operation is reported as stalled and skipped.
    pub max_attempts: u32,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            drain_interval_secs: 60,
            max_attempts: 10,
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// SQLite file name, relative to the data directory.
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "linkshelf.db".to_string(),
        }
    }
}
