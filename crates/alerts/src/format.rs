//! Chat message formatting.

use coinwatch_core::{Ticker, Watch, WatchKey};

pub const HELP_TEXT: &str = "Commands: \n\
    *coin <symbol symbol ...>* - get coin stats \n\
    *rank <n>* - get top N records sorted by market cap\n\
    *watch symbol threshold* - watch coin price change\n\
    *unwatch symbol* - unwatch coin\n\
    *watchlist* - list current watched coins";

pub const NOT_AVAILABLE: &str = "n/a";
pub const CANNOT_FETCH: &str = "Cannot fetch coins";

/// Threshold alert: `[ BTC ] $+7.00 to $110.00`.
pub fn format_alert(symbol: &str, delta: f64, price: f64) -> String {
    format!("[ {} ] ${:+.2} to ${:.2}", symbol, delta, price)
}

/// One `coin` reply line.
pub fn format_quote(ticker: &Ticker) -> String {
    format!(
        "{} ${:.2}, update 1H: {}, update 24H: {}",
        ticker.symbol,
        ticker.price_usd,
        format_percent(ticker.percent_change_1h),
        format_percent(ticker.percent_change_24h)
    )
}

/// One `rank` reply line.
pub fn format_rank_row(ticker: &Ticker) -> String {
    let market = match ticker.market_cap_usd {
        Some(cap) => format!("${:.2}", cap),
        None => NOT_AVAILABLE.to_string(),
    };
    format!(
        "{} : {} => price: ${:.2} : market: {}",
        ticker.name, ticker.symbol, ticker.price_usd, market
    )
}

/// `watchlist` reply: `Tickers: [ { btc:5 } { eth:10 } ]`.
pub fn format_watchlist(entries: &[(WatchKey, Watch)]) -> String {
    let mut msg = String::from("Tickers: [ ");
    for (key, watch) in entries {
        msg.push_str(&format!("{{ {}:{} }} ", key, watch.threshold));
    }
    msg.push(']');
    msg
}

pub fn format_not_found(symbols: &[String]) -> String {
    format!("'{}' not found", symbols.join(" "))
}

pub fn format_unknown_coin(symbol: &str) -> String {
    format!("Coin '{}' does not exist", symbol)
}

pub fn format_watch_created(ticker: &Ticker, threshold: u32) -> String {
    format!(
        "Watching {} ({}) at ${:.2}, threshold ${}",
        ticker.symbol, ticker.name, ticker.price_usd, threshold
    )
}

fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}
