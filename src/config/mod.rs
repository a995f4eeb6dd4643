// src/config/mod.rs
// Client configuration: CLI args > environment > ~/.mealz/config.toml > defaults

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::Weekday;
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "MEALZ_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "MEALZ_TIMEOUT_SECS";
pub const ENV_WEEK_START: &str = "MEALZ_WEEK_START";

/// Resolved settings used by the API client and the calendar
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    /// Applies to regular requests, never to the chat stream
    pub request_timeout: Duration,
    pub week_starts_on: Weekday,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            week_starts_on: Weekday::Sat,
        }
    }
}

impl Config {
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// File config overlaid with the process environment
    pub fn from_env() -> Self {
        Self::resolve(FileConfig::load(), |key| std::env::var(key).ok())
    }

    /// Layer `env` over `file` over the defaults.
    ///
    /// Values that fail to parse are skipped with a warning.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = file.api_url {
            config.api_url = url;
        }
        if let Some(secs) = file.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(day) = file.week_start.as_deref().and_then(|v| parse_value::<Weekday>("week_start", v)) {
            config.week_starts_on = day;
        }

        if let Some(url) = env(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            debug!("Config: {} = {} (from environment)", ENV_API_URL, url);
            config.api_url = url.trim().to_string();
        }
        if let Some(secs) = env(ENV_TIMEOUT_SECS).and_then(|v| parse_value::<u64>(ENV_TIMEOUT_SECS, &v)) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(day) = env(ENV_WEEK_START).and_then(|v| parse_value::<Weekday>(ENV_WEEK_START, &v)) {
            config.week_starts_on = day;
        }

        config
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    let clean = raw.trim();
    match clean.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Config: ignoring invalid {} = {:?}", key, clean);
            None
        }
    }
}

/// Contents of `~/.mealz/config.toml`; every key is optional
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Weekday name, e.g. "saturday" or "Mon"
    pub week_start: Option<String>,
}

impl FileConfig {
    /// Load from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".mealz")
        .join("config.toml")
}
