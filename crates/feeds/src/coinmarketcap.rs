//! CoinMarketCap REST ticker source.
//!
//! `GET {base}/ticker/` returns every listed asset, `GET {base}/ticker/{slug}/`
//! narrows to one. An unknown slug answers 404, which is reported as an empty
//! result rather than an error.

use crate::error::FeedError;
use crate::source::TickerSource;
use crate::wire::decode_tickers;
use async_trait::async_trait;
use coinwatch_core::Ticker;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the CoinMarketCap source.
#[derive(Debug, Clone)]
pub struct CoinMarketCapConfig {
    /// API base, e.g. "https://api.coinmarketcap.com/v1"
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        Self {
            base_url: CoinMarketCapSource::DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Ticker source backed by the CoinMarketCap ticker endpoint.
pub struct CoinMarketCapSource {
    client: reqwest::Client,
    base_url: Url,
}

impl CoinMarketCapSource {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.coinmarketcap.com/v1";

    /// Build a source with its own HTTP client.
    pub fn new(config: CoinMarketCapConfig) -> Result<Self, FeedError> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(FeedError::InvalidUrl(config.base_url));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("coinwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// URL for a ticker request. An empty filter selects the full list.
    pub fn ticker_url(&self, filter: &str) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| FeedError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("ticker");
            let slug = slug(filter);
            if !slug.is_empty() {
                segments.push(&slug);
            }
            segments.push("");
        }
        Ok(url)
    }
}

/// Provider slug for an asset name: "Bitcoin Cash" -> "bitcoin-cash".
fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl TickerSource for CoinMarketCapSource {
    async fn fetch(&self, filter: &str) -> Result<Vec<Ticker>, FeedError> {
        let url = self.ticker_url(filter)?;
        debug!(url = %url, "Fetching tickers");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND && !filter.trim().is_empty() {
            debug!(filter = filter, "Ticker not listed");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let tickers = decode_tickers(&body)?;
        debug!(filter = filter, count = tickers.len(), "Fetched tickers");
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn source(base: &str) -> CoinMarketCapSource {
        CoinMarketCapSource::new(CoinMarketCapConfig {
            base_url: base.to_string(),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn test_ticker_url_all() {
        let src = source("https://api.coinmarketcap.com/v1");
        assert_eq!(
            src.ticker_url("").unwrap().as_str(),
            "https://api.coinmarketcap.com/v1/ticker/"
        );
    }

    #[test]
    fn test_ticker_url_with_trailing_slash_base() {
        let src = source("https://api.coinmarketcap.com/v1/");
        assert_eq!(
            src.ticker_url("Bitcoin").unwrap().as_str(),
            "https://api.coinmarketcap.com/v1/ticker/bitcoin/"
        );
    }

    #[test]
    fn test_ticker_url_multi_word_name() {
        let src = source("https://api.coinmarketcap.com/v1");
        assert_eq!(
            src.ticker_url("Bitcoin Cash").unwrap().as_str(),
            "https://api.coinmarketcap.com/v1/ticker/bitcoin-cash/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = CoinMarketCapSource::new(CoinMarketCapConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(FeedError::InvalidUrl(_))));

        let result = CoinMarketCapSource::new(CoinMarketCapConfig {
            base_url: "mailto:nobody@example.com".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(FeedError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transient() {
        // Nothing listens on the loopback discard port.
        let src = source("http://127.0.0.1:9/v1");
        let err = src.fetch("").await.unwrap_err();
        assert!(err.is_transient());
    }
}
