//! Application configuration.

use coinwatch_alerts::{DispatcherConfig, SchedulerConfig};
use coinwatch_feeds::{CoinMarketCapConfig, CoinMarketCapSource};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database holding the watchlist.
    pub database_url: String,
    /// Seconds between price poll cycles.
    pub poll_interval_secs: u64,
    /// Market data API base.
    pub ticker_base_url: String,
    pub request_timeout_secs: u64,
    /// Outbound chat messages buffered before senders wait.
    pub outbox_capacity: usize,
    pub rank_default: usize,
    pub rank_max: usize,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let dispatcher = DispatcherConfig::default();
        Self {
            database_url: "sqlite://coins.db".to_string(),
            poll_interval_secs: 120,
            ticker_base_url: CoinMarketCapSource::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            outbox_capacity: 256,
            rank_default: dispatcher.rank_default,
            rank_max: dispatcher.rank_max,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: display,
                    source,
                })
            }
        };
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be > 0".to_string()));
        }
        if self.outbox_capacity == 0 {
            return Err(ConfigError::Invalid("outbox_capacity must be > 0".to_string()));
        }
        if self.rank_default == 0 || self.rank_default > self.rank_max {
            return Err(ConfigError::Invalid(format!(
                "rank_default must be in 1..={}",
                self.rank_max
            )));
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig::with_interval(Duration::from_secs(self.poll_interval_secs))
    }

    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            rank_default: self.rank_default,
            rank_max: self.rank_max,
        }
    }

    pub fn ticker_source(&self) -> CoinMarketCapConfig {
        CoinMarketCapConfig {
            base_url: self.ticker_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
