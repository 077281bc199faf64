//! In-process fakes shared by unit tests.

use crate::chat::{ChatBridge, ChatError, InboundMessage, OutboundMessage};
use crate::store::{StoreError, WatchStore};
use async_trait::async_trait;
use coinwatch_core::Ticker;
use coinwatch_feeds::{FeedError, TickerSource};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Ticker source serving a mutable in-memory list.
///
/// A non-empty filter selects tickers by name, like the real provider.
#[derive(Default)]
pub struct FakeSource {
    tickers: Mutex<Vec<Ticker>>,
    failing: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    panic: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(tickers: Vec<Ticker>) -> Self {
        Self {
            tickers: Mutex::new(tickers),
            ..Default::default()
        }
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        for ticker in self.tickers.lock().unwrap().iter_mut() {
            if ticker.matches_symbol(symbol) {
                ticker.price_usd = price;
            }
        }
    }

    /// Fail fetches filtered by this name.
    pub fn fail_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_lowercase());
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_fetch(&self) {
        self.panic.store(true, Ordering::SeqCst);
    }

    /// Make every fetch take this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TickerSource for FakeSource {
    async fn fetch(&self, filter: &str) -> Result<Vec<Ticker>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic.load(Ordering::SeqCst) {
            panic!("fake source exploded");
        }
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing.lock().unwrap().contains(&filter.to_lowercase())
        {
            return Err(FeedError::ConnectionFailed("unreachable".to_string()));
        }
        let tickers = self.tickers.lock().unwrap().clone();
        if filter.is_empty() {
            Ok(tickers)
        } else {
            Ok(tickers.into_iter().filter(|t| t.matches_name(filter)).collect())
        }
    }
}

/// Blob store kept in a map.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Sqlx(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl WatchStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Chat bridge replaying a fixed script, then reporting the session closed.
pub struct ScriptedBridge {
    inbound: tokio::sync::Mutex<VecDeque<InboundMessage>>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl ScriptedBridge {
    pub fn new(inbound: Vec<InboundMessage>) -> Self {
        Self {
            inbound: tokio::sync::Mutex::new(inbound.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBridge for ScriptedBridge {
    async fn receive(&self) -> Result<InboundMessage, ChatError> {
        self.inbound.lock().await.pop_front().ok_or(ChatError::Closed)
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Tickers used across tests: BTC at 100, ETH at 10, DOGE at 0.1.
pub fn sample_tickers() -> Vec<Ticker> {
    vec![
        Ticker::new("bitcoin", "Bitcoin", "BTC", 100.0)
            .with_market_cap(3000.0)
            .with_changes(0.5, 1.2),
        Ticker::new("ethereum", "Ethereum", "ETH", 10.0)
            .with_market_cap(2000.0)
            .with_changes(-0.25, 3.0),
        Ticker::new("dogecoin", "Dogecoin", "DOGE", 0.1).with_market_cap(500.0),
    ]
}
