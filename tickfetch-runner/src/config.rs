//! Download configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! base_url = "https://eodhd.com/api"
//! token_env = "EODHD_API_KEY"
//! chunk_days = 100
//! interval = "1m"
//! workers = 10
//! empty_is_failure = true
//! dividend_date_fields = ["recordDate", "date"]
//! dividend_value_field = "unadjustedValue"
//! ```

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tickfetch_core::data::eodhd::{DEFAULT_BASE_URL, INVALID_TOKEN_MARKER};
use tickfetch_core::data::ClientConfig;
use tickfetch_core::BarInterval;

/// Largest accepted `chunk_days`; the provider's own caps are far lower.
pub const MAX_CHUNK_DAYS: i64 = 3_650;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no API token: pass --token or set {var}")]
    MissingToken { var: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub base_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    pub request_timeout_secs: u64,
    pub inter_request_delay_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    /// Unset means retry 429 responses forever.
    pub max_rate_limit_retries: Option<u32>,
    /// Largest span of one intraday request, in days.
    pub chunk_days: i64,
    pub interval: BarInterval,
    /// Worker threads for parallel downloads.
    pub workers: usize,
    pub data_dir: PathBuf,
    /// Record a ticker as failed when the provider returns zero rows.
    pub empty_is_failure: bool,
    pub dividend_date_fields: Vec<String>,
    pub dividend_value_field: String,
    pub invalid_token_marker: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_env: "EODHD_API_KEY".to_string(),
            request_timeout_secs: 10,
            inter_request_delay_ms: 200,
            rate_limit_cooldown_secs: 60,
            max_rate_limit_retries: None,
            chunk_days: 100,
            interval: BarInterval::OneMinute,
            workers: 10,
            data_dir: PathBuf::from("data"),
            empty_is_failure: true,
            dividend_date_fields: vec!["recordDate".to_string(), "date".to_string()],
            dividend_value_field: "unadjustedValue".to_string(),
            invalid_token_marker: INVALID_TOKEN_MARKER.to_string(),
        }
    }
}

impl DownloadConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CHUNK_DAYS).contains(&self.chunk_days) {
            return Err(ConfigError::Invalid(format!(
                "chunk_days must be between 1 and {MAX_CHUNK_DAYS}, got {}",
                self.chunk_days
            )));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.dividend_date_fields.is_empty() {
            return Err(ConfigError::Invalid(
                "dividend_date_fields must name at least one field".into(),
            ));
        }
        Ok(())
    }

    /// Pick the explicit token if given, else read `token_env`.
    pub fn resolve_token(&self, explicit: Option<String>) -> Result<String, ConfigError> {
        explicit
            .or_else(|| std::env::var(&self.token_env).ok())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingToken {
                var: self.token_env.clone(),
            })
    }

    /// Client settings derived from this config.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            inter_request_delay: Duration::from_millis(self.inter_request_delay_ms),
            rate_limit_cooldown: Duration::from_secs(self.rate_limit_cooldown_secs),
            max_rate_limit_retries: self.max_rate_limit_retries,
            chunk_window: TimeDelta::days(self.chunk_days),
            interval: self.interval,
            dividend_date_fields: self.dividend_date_fields.clone(),
            dividend_value_field: self.dividend_value_field.clone(),
            invalid_token_marker: self.invalid_token_marker.clone(),
        }
    }
}
