//! In-memory watch registry.

use coinwatch_core::{Watch, WatchKey};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The set of live watches, keyed by lower-cased symbol.
///
/// Every operation takes the lock once, so callers never observe a partially
/// applied change. Nothing here touches the store.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    watches: RwLock<HashMap<WatchKey, Watch>>,
}

pub type SharedRegistry = Arc<WatchRegistry>;

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a watch. Returns true if an entry was replaced.
    pub async fn create(&self, key: WatchKey, watch: Watch) -> bool {
        self.watches.write().await.insert(key, watch).is_some()
    }

    /// Remove a watch. Returns true if it existed.
    pub async fn remove(&self, key: &WatchKey) -> bool {
        self.watches.write().await.remove(key).is_some()
    }

    pub async fn get(&self, key: &WatchKey) -> Option<Watch> {
        self.watches.read().await.get(key).cloned()
    }

    /// Snapshot of all watches, sorted by key.
    pub async fn list_all(&self) -> Vec<(WatchKey, Watch)> {
        let mut entries: Vec<(WatchKey, Watch)> = self
            .watches
            .read()
            .await
            .iter()
            .map(|(k, w)| (k.clone(), w.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Record a newly observed price. No-op if the watch was removed.
    pub async fn update_price(&self, key: &WatchKey, price: f64) -> bool {
        match self.watches.write().await.get_mut(key) {
            Some(watch) => {
                watch.last_observed_price = if price.is_finite() { price.max(0.0) } else { 0.0 };
                true
            }
            None => false,
        }
    }

    /// Bulk insert watches restored from the store. Returns the new size.
    pub async fn load(&self, entries: impl IntoIterator<Item = (WatchKey, Watch)>) -> usize {
        let mut watches = self.watches.write().await;
        watches.extend(entries);
        watches.len()
    }

    pub async fn len(&self) -> usize {
        self.watches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.watches.read().await.is_empty()
    }
}
