//! Maps parsed chat commands onto the registry and the ticker source.

use crate::chat::{InboundMessage, Outbox};
use crate::command::{Command, CommandParser, Parsed};
use crate::config::DispatcherConfig;
use crate::format::{
    format_not_found, format_quote, format_rank_row, format_unknown_coin, format_watch_created,
    format_watchlist, CANNOT_FETCH, HELP_TEXT, NOT_AVAILABLE,
};
use crate::registry::SharedRegistry;
use crate::store::{persist_watch, WatchStore};
use coinwatch_core::{sort_by_market_cap, Watch, WatchKey};
use coinwatch_feeds::SharedTickerSource;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Command handler shared by the receive loop and the tasks it spawns.
pub struct CommandDispatcher {
    parser: CommandParser,
    registry: SharedRegistry,
    store: Arc<dyn WatchStore>,
    source: SharedTickerSource,
    outbox: Outbox,
    config: DispatcherConfig,
}

impl CommandDispatcher {
    pub fn new(
        identity: impl Into<String>,
        registry: SharedRegistry,
        store: Arc<dyn WatchStore>,
        source: SharedTickerSource,
        outbox: Outbox,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            parser: CommandParser::new(identity, config.rank_default),
            registry,
            store,
            source,
            outbox,
            config,
        }
    }

    /// Handle one inbound message.
    ///
    /// Commands that fetch tickers are spawned and their handle returned;
    /// everything else is answered before this returns.
    pub async fn dispatch(self: &Arc<Self>, message: InboundMessage) -> Option<JoinHandle<()>> {
        match self.parser.parse(&message) {
            Parsed::Ignored => None,
            Parsed::Malformed(reason) => {
                debug!(channel = %message.channel_id, reason = %reason, "Malformed command");
                self.outbox.post(message.reply(HELP_TEXT)).await;
                None
            }
            Parsed::Rejected(reply) => {
                debug!(channel = %message.channel_id, reply = %reply, "Rejected command");
                self.outbox.post(message.reply(reply)).await;
                None
            }
            Parsed::Recognized(command) if command.needs_fetch() => {
                Some(self.spawn_command(message, command))
            }
            Parsed::Recognized(command) => {
                if let Some(reply) = self.execute(&message, command).await {
                    self.outbox.post(message.reply(reply)).await;
                }
                None
            }
        }
    }

    /// Run a command on its own task. A panic inside it is answered with help.
    fn spawn_command(self: &Arc<Self>, message: InboundMessage, command: Command) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let worker = Arc::clone(&this);
            let request = message.clone();
            let outcome = tokio::spawn(async move { worker.execute(&request, command).await }).await;

            let reply = match outcome {
                Ok(reply) => reply,
                Err(e) => {
                    error!(channel = %message.channel_id, error = %e, "Command task failed");
                    Some(HELP_TEXT.to_string())
                }
            };
            if let Some(reply) = reply {
                this.outbox.post(message.reply(reply)).await;
            }
        })
    }

    /// Execute a command and return the reply, if any.
    pub async fn execute(&self, message: &InboundMessage, command: Command) -> Option<String> {
        match command {
            Command::Watch { symbol, threshold } => {
                Some(self.watch(&message.channel_id, symbol, threshold).await)
            }
            Command::Unwatch { symbol } => {
                self.unwatch(&symbol).await;
                None
            }
            Command::Watchlist => Some(format_watchlist(&self.registry.list_all().await)),
            Command::Coin { symbols } => Some(self.coin(&symbols).await),
            Command::Rank { limit } => Some(self.rank(limit).await),
            Command::Help => Some(HELP_TEXT.to_string()),
        }
    }

    /// Create or replace a watch at the current price.
    pub async fn watch(&self, channel_id: &str, key: WatchKey, threshold: u32) -> String {
        let tickers = match self.source.fetch("").await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!(key = %key, error = %e, "Cannot fetch coins for watch");
                return CANNOT_FETCH.to_string();
            }
        };

        let Some(ticker) = tickers.into_iter().find(|t| t.matches_symbol(key.as_str())) else {
            return format_unknown_coin(key.as_str());
        };

        let watch = Watch::new(channel_id, ticker.name.clone(), ticker.price_usd, threshold);
        let replaced = self.registry.create(key.clone(), watch.clone()).await;
        info!(
            key = %key,
            channel = %channel_id,
            threshold = threshold,
            price = ticker.price_usd,
            replaced = replaced,
            "Watch created"
        );

        if let Err(e) = persist_watch(self.store.as_ref(), &key, &watch).await {
            error!(key = %key, error = %e, "Failed to persist watch");
        }

        format_watch_created(&ticker, threshold)
    }

    /// Remove a watch. Absent keys are a no-op.
    pub async fn unwatch(&self, key: &WatchKey) {
        if self.registry.remove(key).await {
            info!(key = %key, "Watch removed");
        }
        if let Err(e) = self.store.delete(key.as_str()).await {
            error!(key = %key, error = %e, "Failed to delete stored watch");
        }
    }

    /// Quote lines for every requested symbol that is listed.
    pub async fn coin(&self, symbols: &[String]) -> String {
        let tickers = match self.source.fetch("").await {
            Ok(tickers) if !tickers.is_empty() => tickers,
            Ok(_) => return NOT_AVAILABLE.to_string(),
            Err(e) => {
                warn!(error = %e, "Cannot fetch coins for quote");
                return NOT_AVAILABLE.to_string();
            }
        };

        let lines: Vec<String> = tickers
            .iter()
            .filter(|t| symbols.iter().any(|s| t.matches_symbol(s)))
            .map(format_quote)
            .collect();

        if lines.is_empty() {
            format_not_found(symbols)
        } else {
            lines.join("\n")
        }
    }

    /// Top assets by market cap, at most `rank_max` rows.
    pub async fn rank(&self, limit: usize) -> String {
        let mut tickers = match self.source.fetch("").await {
            Ok(tickers) if !tickers.is_empty() => tickers,
            Ok(_) => return NOT_AVAILABLE.to_string(),
            Err(e) => {
                warn!(error = %e, "Cannot fetch coins for rank");
                return NOT_AVAILABLE.to_string();
            }
        };

        sort_by_market_cap(&mut tickers);
        tickers
            .iter()
            .take(limit.min(self.config.rank_max))
            .map(format_rank_row)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::OutboundMessage;
    use crate::registry::WatchRegistry;
    use crate::testing::{sample_tickers, FakeSource, MemoryStore};
    use coinwatch_core::Ticker;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    struct Fixture {
        dispatcher: Arc<CommandDispatcher>,
        registry: SharedRegistry,
        store: Arc<MemoryStore>,
        source: Arc<FakeSource>,
        rx: mpsc::Receiver<OutboundMessage>,
    }

    fn fixture_with(tickers: Vec<Ticker>) -> Fixture {
        let registry = Arc::new(WatchRegistry::new());
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(tickers));
        let (outbox, rx) = Outbox::channel(64);
        let dispatcher = Arc::new(CommandDispatcher::new(
            "@coinbot",
            registry.clone(),
            store.clone(),
            source.clone(),
            outbox,
            DispatcherConfig::default(),
        ));
        Fixture {
            dispatcher,
            registry,
            store,
            source,
            rx,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(sample_tickers())
    }

    impl Fixture {
        /// Dispatch one message, wait for any spawned task, return the replies.
        async fn say(&mut self, text: &str) -> Vec<String> {
            let message = InboundMessage::text("chan", text);
            if let Some(handle) = self.dispatcher.dispatch(message).await {
                handle.await.unwrap();
            }
            let mut replies = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                assert_eq!(msg.channel_id, "chan");
                replies.push(msg.text);
            }
            replies
        }
    }

    #[tokio::test]
    async fn test_watch_then_watchlist() {
        let mut f = fixture();
        let replies = f.say("@coinbot watch BTC 5").await;
        assert_eq!(replies, vec!["Watching BTC (Bitcoin) at $100.00, threshold $5"]);

        let watch = f.registry.get(&WatchKey::new("btc")).await.unwrap();
        assert_eq!(watch, Watch::new("chan", "Bitcoin", 100.0, 5));
        assert_eq!(
            f.store.get("btc").as_deref(),
            Some(r#"{"channel":"chan","name":"Bitcoin","threshold":5}"#)
        );

        assert_eq!(f.say("@coinbot watchlist").await, vec!["Tickers: [ { btc:5 } ]"]);
    }

    #[tokio::test]
    async fn test_watch_twice_replaces() {
        let mut f = fixture();
        f.say("@coinbot watch btc 5").await;
        f.say("@coinbot watch BTC 8").await;
        assert_eq!(f.registry.len().await, 1);
        assert_eq!(f.registry.get(&WatchKey::new("btc")).await.unwrap().threshold, 8);
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_watch_bad_threshold_never_mutates() {
        let mut f = fixture();
        for text in ["@coinbot watch btc abc", "@coinbot watch btc 0", "@coinbot watch btc -1"] {
            let replies = f.say(text).await;
            assert_eq!(replies.len(), 1);
            assert!(replies[0].starts_with("Cannot parse threshold"));
        }
        assert!(f.registry.is_empty().await);
        assert_eq!(f.store.len(), 0);
        assert_eq!(f.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_watch_unknown_coin() {
        let mut f = fixture();
        assert_eq!(
            f.say("@coinbot watch nope 5").await,
            vec!["Coin 'nope' does not exist"]
        );
        assert!(f.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_watch_fetch_failure() {
        let mut f = fixture();
        f.source.fail_all(true);
        assert_eq!(f.say("@coinbot watch btc 5").await, vec!["Cannot fetch coins"]);
        assert!(f.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_watch_persist_failure_keeps_memory_state() {
        let mut f = fixture();
        f.store.fail_writes(true);
        let replies = f.say("@coinbot watch eth 2").await;
        assert_eq!(replies.len(), 1);
        assert!(f.registry.get(&WatchKey::new("eth")).await.is_some());
        assert_eq!(f.store.len(), 0);
    }

    #[tokio::test]
    async fn test_unwatch() {
        let mut f = fixture();
        f.say("@coinbot watch btc 5").await;
        f.say("@coinbot watch eth 5").await;

        assert!(f.say("@coinbot unwatch BTC").await.is_empty());
        assert_eq!(f.registry.len().await, 1);
        assert_eq!(f.store.get("btc"), None);
        assert!(f.store.get("eth").is_some());
    }

    #[tokio::test]
    async fn test_unwatch_absent_is_noop() {
        let mut f = fixture();
        f.say("@coinbot watch btc 5").await;
        assert!(f.say("@coinbot unwatch doge").await.is_empty());
        assert_eq!(f.registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_coin_matches_case_insensitively() {
        let mut f = fixture();
        let replies = f.say("@coinbot coin btc ETH xyz").await;
        assert_eq!(
            replies,
            vec![
                "BTC $100.00, update 1H: 0.50%, update 24H: 1.20%\n\
                 ETH $10.00, update 1H: -0.25%, update 24H: 3.00%"
            ]
        );
    }

    #[tokio::test]
    async fn test_watch_non_ascii_symbol() {
        let mut f = fixture_with(vec![Ticker::new("ether-e", "Ether E", "ÉTH", 2.0)]);
        assert_eq!(
            f.say("@coinbot watch ÉTH 1").await,
            vec!["Watching ÉTH (Ether E) at $2.00, threshold $1"]
        );
        assert!(f.registry.get(&WatchKey::new("Éth")).await.is_some());
        assert_eq!(
            f.say("@coinbot coin éth ÉTH").await,
            vec!["ÉTH $2.00, update 1H: n/a, update 24H: n/a"]
        );
    }

    #[tokio::test]
    async fn test_coin_not_found() {
        let mut f = fixture();
        assert_eq!(f.say("@coinbot coin foo bar").await, vec!["'foo bar' not found"]);
    }

    #[tokio::test]
    async fn test_coin_fetch_failure() {
        let mut f = fixture();
        f.source.fail_all(true);
        assert_eq!(f.say("@coinbot coin btc").await, vec!["n/a"]);

        let mut empty = fixture_with(Vec::new());
        assert_eq!(empty.say("@coinbot coin btc").await, vec!["n/a"]);
    }

    #[tokio::test]
    async fn test_rank_sorted_and_limited() {
        let mut f = fixture();
        let replies = f.say("@coinbot rank 2").await;
        assert_eq!(
            replies,
            vec![
                "Bitcoin : BTC => price: $100.00 : market: $3000.00\n\
                 Ethereum : ETH => price: $10.00 : market: $2000.00"
            ]
        );
    }

    #[tokio::test]
    async fn test_rank_caps_at_thirty() {
        let tickers: Vec<Ticker> = (0..40)
            .map(|i| {
                Ticker::new(&format!("c{}", i), &format!("Coin{}", i), &format!("C{}", i), 1.0)
                    .with_market_cap(f64::from(i))
            })
            .collect();
        let mut f = fixture_with(tickers);

        let replies = f.say("@coinbot rank 100").await;
        let rows: Vec<&str> = replies[0].lines().collect();
        assert_eq!(rows.len(), 30);
        assert!(rows[0].starts_with("Coin39 "));
        assert!(rows[29].starts_with("Coin10 "));

        let replies = f.say("@coinbot rank junk").await;
        assert_eq!(replies[0].lines().count(), 10);
    }

    #[tokio::test]
    async fn test_rank_fetch_failure() {
        let mut f = fixture();
        f.source.fail_all(true);
        assert_eq!(f.say("@coinbot rank").await, vec!["n/a"]);
    }

    #[tokio::test]
    async fn test_help_for_unknown_and_malformed() {
        let mut f = fixture();
        assert_eq!(f.say("@coinbot moon").await, vec![HELP_TEXT]);
        assert_eq!(f.say("@coinbot watch btc").await, vec![HELP_TEXT]);
        assert_eq!(f.say("@coinbot").await, vec![HELP_TEXT]);
    }

    #[tokio::test]
    async fn test_unaddressed_messages_ignored() {
        let mut f = fixture();
        assert!(f.say("watch btc 5").await.is_empty());
        assert!(f.say("@someoneelse rank").await.is_empty());
        assert_eq!(f.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_panicking_command_answers_help() {
        let mut f = fixture();
        f.source.panic_on_fetch();
        assert_eq!(f.say("@coinbot rank 3").await, vec![HELP_TEXT]);
        // The dispatcher keeps working afterwards
        assert_eq!(f.say("@coinbot watchlist").await, vec!["Tickers: [ ]"]);
    }
}
