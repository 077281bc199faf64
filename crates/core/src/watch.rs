//! Watch records and registry keys.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while building a watch from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("Cannot parse threshold {0}")]
    InvalidThreshold(String),
}

/// Registry key: the lower-cased asset symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchKey(CompactString);

impl WatchKey {
    /// Build a key from a symbol in any case.
    pub fn new(symbol: &str) -> Self {
        Self(CompactString::new(symbol.trim().to_ascii_lowercase()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for WatchKey {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price watch on one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Watch {
    /// Chat channel receiving alerts
    pub channel_id: String,
    /// Asset name as reported by the ticker source at creation
    pub display_name: String,
    /// Price seen on the last successful poll (0 = no baseline yet)
    pub last_observed_price: f64,
    /// Minimum absolute USD move that triggers an alert
    pub threshold: u32,
}

impl Watch {
    /// Create a watch. Negative prices are clamped to zero.
    pub fn new(
        channel_id: impl Into<String>,
        display_name: impl Into<String>,
        initial_price: f64,
        threshold: u32,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            display_name: display_name.into(),
            last_observed_price: clamp_price(initial_price),
            threshold,
        }
    }

    /// True once a positive price has been observed.
    #[inline]
    pub fn has_baseline(&self) -> bool {
        self.last_observed_price > 0.0
    }

    /// Persisted form of this watch.
    pub fn to_stored(&self) -> StoredWatch {
        StoredWatch {
            channel: self.channel_id.clone(),
            name: self.display_name.clone(),
            threshold: self.threshold,
        }
    }
}

/// Watch record as written to the store.
///
/// The observed price is left out: a restored watch re-establishes its
/// baseline on the first poll after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWatch {
    pub channel: String,
    pub name: String,
    pub threshold: u32,
}

impl StoredWatch {
    /// Restore a watch without a price baseline.
    pub fn into_watch(self) -> Watch {
        Watch::new(self.channel, self.name, 0.0, self.threshold)
    }
}

/// Parse a threshold argument; only positive integers are accepted.
pub fn parse_threshold(raw: &str) -> Result<u32, WatchError> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(WatchError::InvalidThreshold(raw.to_string())),
    }
}

#[inline]
fn clamp_price(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        price
    } else {
        0.0
    }
}
