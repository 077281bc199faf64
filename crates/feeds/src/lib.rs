//! Market data sources for the coin watch bot.
//!
//! ## Architecture
//!
//! - `source` - the `TickerSource` trait consumed by the watcher and commands
//! - `wire` - decoding of provider payloads where numbers arrive as strings
//! - `coinmarketcap` - REST implementation against the CoinMarketCap ticker API

pub mod coinmarketcap;
pub mod error;
pub mod source;
pub mod wire;

pub use coinmarketcap::{CoinMarketCapConfig, CoinMarketCapSource};
pub use error::*;
pub use source::*;
pub use wire::decode_tickers;
