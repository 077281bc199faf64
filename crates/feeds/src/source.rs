//! Ticker source abstraction.

use crate::FeedError;
use async_trait::async_trait;
use coinwatch_core::Ticker;
use std::sync::Arc;

/// Provider of current market data.
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Fetch tickers matching `filter`.
    ///
    /// An empty filter returns every known asset. A non-empty filter is
    /// interpreted by the provider and may return zero or several tickers;
    /// an empty result is a successful "no match".
    async fn fetch(&self, filter: &str) -> Result<Vec<Ticker>, FeedError>;
}

#[async_trait]
impl<T: TickerSource + ?Sized> TickerSource for Arc<T> {
    async fn fetch(&self, filter: &str) -> Result<Vec<Ticker>, FeedError> {
        (**self).fetch(filter).await
    }
}

/// Shared handle to a ticker source.
pub type SharedTickerSource = Arc<dyn TickerSource>;
