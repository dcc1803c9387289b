// Local configuration for sync clients.
//
// Global config: `~/.canvas/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::engine::controller::SyncTimings;
use crate::engine::poller::DEFAULT_POLL_INTERVAL_MS;
use crate::engine::scheduler::DEFAULT_DEBOUNCE_MS;

/// Environment variable that overrides `store_url`.
pub const STORE_URL_ENV: &str = "CANVAS_STORE_URL";

pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:8000/api/";

const MIN_DEBOUNCE_MS: u64 = 100;
const MAX_DEBOUNCE_MS: u64 = 60_000;
const MIN_POLL_INTERVAL_MS: u64 = 250;
const MAX_POLL_INTERVAL_MS: u64 = 300_000;

/// Root directory for Canvas client state: `~/.canvas/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".canvas"))
}

/// Path to the config file: `~/.canvas/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Client configuration at `~/.canvas/config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the document store, e.g. `http://127.0.0.1:8000/api/`.
    pub store_url: String,
    /// Quiet period before buffered edits are written.
    pub debounce_ms: u64,
    /// Period between fetches of the open document.
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.into(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SyncConfig {
    /// Load from `~/.canvas/config.toml`, then apply the environment
    /// override. Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match global_config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(STORE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.store_url = url;
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    pub fn timings(&self) -> SyncTimings {
        SyncTimings { debounce: self.debounce(), poll_interval: self.poll_interval() }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
