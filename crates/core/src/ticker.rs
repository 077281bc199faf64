//! Market ticker snapshots.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Point-in-time market data for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Provider identifier (e.g., "bitcoin")
    pub id: String,
    /// Display name (e.g., "Bitcoin")
    pub name: String,
    /// Trading symbol (e.g., "BTC")
    pub symbol: CompactString,
    /// Market-cap rank, 0 when unknown
    pub rank: u16,
    pub price_usd: f64,
    pub price_btc: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub available_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    /// Unix seconds of the provider's last update
    pub last_updated: Option<i64>,
}

impl Ticker {
    /// Create a ticker with only the required fields set.
    pub fn new(id: &str, name: &str, symbol: &str, price_usd: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            symbol: CompactString::new(symbol),
            rank: 0,
            price_usd,
            price_btc: None,
            volume_24h_usd: None,
            market_cap_usd: None,
            available_supply: None,
            total_supply: None,
            percent_change_1h: None,
            percent_change_24h: None,
            percent_change_7d: None,
            last_updated: None,
        }
    }

    pub fn with_market_cap(mut self, market_cap_usd: f64) -> Self {
        self.market_cap_usd = Some(market_cap_usd);
        self
    }

    pub fn with_changes(mut self, change_1h: f64, change_24h: f64) -> Self {
        self.percent_change_1h = Some(change_1h);
        self.percent_change_24h = Some(change_24h);
        self
    }

    /// Case-insensitive symbol comparison.
    #[inline]
    pub fn matches_symbol(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }

    /// Case-insensitive name comparison.
    #[inline]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Market cap, treating unknown as zero.
    #[inline]
    pub fn market_cap(&self) -> f64 {
        self.market_cap_usd.unwrap_or(0.0)
    }
}

/// Sort tickers by market capitalization, largest first.
pub fn sort_by_market_cap(tickers: &mut [Ticker]) {
    tickers.sort_by(|a, b| b.market_cap().total_cmp(&a.market_cap()));
}
