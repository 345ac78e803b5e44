// Configuration for subfeed.
// Loads backend endpoints and retry settings from TOML with env overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::paths;
use crate::error::Result;

const DEFAULT_API_BASE: &str = "http://localhost:8080";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 2000;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_GRID_COLUMNS: usize = 3;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend API.
    pub api_base: String,
    /// Path that starts the OAuth redirect flow.
    pub login_path: String,
    /// Path of the subscription feed.
    pub videos_path: String,
    /// Path prefix of the search endpoint; the query is appended as a segment.
    pub search_path: String,
    /// Path that exchanges an authorization code for tokens.
    pub exchange_path: String,
    /// Number of columns in the video grid.
    pub grid_columns: usize,
    pub retry: RetryConfig,
}

/// Retry settings for the feed fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Constant delay between attempts.
    pub backoff_ms: u64,
    /// Timeout applied to each attempt.
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            login_path: "/login".to_string(),
            videos_path: "/subscriptions/videos".to_string(),
            search_path: "/search".to_string(),
            exchange_path: "/api/exchange-code".to_string(),
            grid_columns: DEFAULT_GRID_COLUMNS,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Parse a TOML document. Missing fields fall back to defaults.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from an explicit path, or the default location if none is given.
    /// A missing default file yields the default config; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = Self::from_toml(&raw)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply `SUBFEED_*` overrides through the given lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup("SUBFEED_API_BASE").filter(|v| !v.is_empty()) {
            self.api_base = base;
        }
        if let Some(path) = lookup("SUBFEED_SEARCH_PATH").filter(|v| !v.is_empty()) {
            self.search_path = path;
        }
    }

    /// Default path of the config file, if a config dir is available.
    pub fn default_path() -> Option<PathBuf> {
        paths::config_path()
    }
}
