//! commitwatch configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ipc::DEFAULT_TCP_ADDRESS;
use crate::status::DEFAULT_MAX_COMMITS;

const LOCAL_CONFIG: &str = ".commitwatch.yml";

/// Main commitwatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Watcher settings
    pub watch: WatchConfig,

    /// Output settings
    pub display: DisplayConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Never fails: a missing or broken config file means "no level configured".
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::candidates().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// Project-local config, then user config
    fn candidates() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("commitwatch").join("commitwatch.yml"));
        }
        candidates
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Unix socket path; defaults to the runtime directory
    #[serde(rename = "socket-path")]
    pub socket_path: Option<PathBuf>,

    /// Loopback address used where Unix sockets are unavailable
    #[serde(rename = "tcp-address")]
    pub tcp_address: String,

    /// Status recompute interval
    #[serde(rename = "refresh-interval-ms")]
    pub refresh_interval_ms: u64,

    /// Commits shown per view; 0 means the default
    #[serde(rename = "max-commits")]
    pub max_commits: usize,

    /// Resolve a path inside a repository to that repository
    #[serde(rename = "search-parents")]
    pub search_parents: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            tcp_address: DEFAULT_TCP_ADDRESS.to_string(),
            refresh_interval_ms: 100,
            max_commits: DEFAULT_MAX_COMMITS,
            search_parents: true,
        }
    }
}

impl WatchConfig {
    /// Refresh interval, never zero
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn max_commits(&self) -> usize {
        if self.max_commits == 0 {
            DEFAULT_MAX_COMMITS
        } else {
            self.max_commits
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Colored plain-text output
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { color: true }
    }
}
