//! Ticker payload decoding.
//!
//! The provider encodes every numeric field as a JSON string, and leaves
//! fields it has no value for as `null` or `""`. Optional fields that do not
//! parse decode to `None`. A record without a symbol or a usable USD price is
//! dropped instead of failing the whole response.

use crate::FeedError;
use coinwatch_core::Ticker;
use compact_str::CompactString;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Raw ticker record as sent by the provider.
#[derive(Debug, Default, Deserialize)]
pub struct RawTicker {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rank: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_btc: Option<f64>,
    #[serde(default, rename = "24h_volume_usd", deserialize_with = "lenient_f64")]
    pub volume_24h_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub available_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percent_change_1h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percent_change_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percent_change_7d: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_updated: Option<f64>,
}

impl RawTicker {
    /// Convert into a ticker. Returns None when symbol or price is unusable.
    pub fn into_ticker(self) -> Option<Ticker> {
        let symbol = self.symbol.filter(|s| !s.trim().is_empty())?;
        let price_usd = self.price_usd.filter(|p| *p >= 0.0)?;
        let id = self.id.unwrap_or_default();
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| id.clone());

        Some(Ticker {
            id,
            name,
            symbol: CompactString::new(symbol.trim()),
            rank: self
                .rank
                .filter(|r| *r >= 0.0 && *r <= u16::MAX as f64)
                .map(|r| r as u16)
                .unwrap_or(0),
            price_usd,
            price_btc: self.price_btc,
            volume_24h_usd: self.volume_24h_usd,
            market_cap_usd: self.market_cap_usd,
            available_supply: self.available_supply,
            total_supply: self.total_supply,
            percent_change_1h: self.percent_change_1h,
            percent_change_24h: self.percent_change_24h,
            percent_change_7d: self.percent_change_7d,
            last_updated: self.last_updated.map(|t| t as i64),
        })
    }
}

/// Accept a number, a numeric string, or anything else as None.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|n| n.is_finite()))
}

/// Decode a ticker list response body.
///
/// The body must be a JSON array; anything else is a parse error.
pub fn decode_tickers(body: &str) -> Result<Vec<Ticker>, FeedError> {
    let records: Vec<Value> = serde_json::from_str(body)?;
    let total = records.len();

    let tickers: Vec<Ticker> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<RawTicker>(record) {
            Ok(raw) => raw.into_ticker(),
            Err(e) => {
                debug!(error = %e, "Skipping undecodable ticker record");
                None
            }
        })
        .collect();

    if tickers.len() < total {
        debug!(
            skipped = total - tickers.len(),
            total = total,
            "Dropped ticker records without symbol or price"
        );
    }

    Ok(tickers)
}
