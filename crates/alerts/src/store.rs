//! Durable watch persistence.

use async_trait::async_trait;
use coinwatch_core::{StoredWatch, Watch, WatchKey};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed blob store holding serialized watches.
#[async_trait]
pub trait WatchStore: Send + Sync {
    /// Every stored `(key, blob)` pair.
    async fn load_all(&self) -> Result<Vec<(String, String)>, StoreError>;

    /// Insert or overwrite a blob.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a blob; deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Serialize and store a watch under its key.
pub async fn persist_watch(
    store: &dyn WatchStore,
    key: &WatchKey,
    watch: &Watch,
) -> Result<(), StoreError> {
    let blob = serde_json::to_string(&watch.to_stored())?;
    store.put(key.as_str(), &blob).await
}

/// Load every decodable watch. Undecodable records are logged and skipped.
pub async fn load_watches(store: &dyn WatchStore) -> Result<Vec<(WatchKey, Watch)>, StoreError> {
    let records = store.load_all().await?;
    let watches = records
        .into_iter()
        .filter_map(|(key, blob)| match serde_json::from_str::<StoredWatch>(&blob) {
            Ok(stored) if stored.threshold > 0 => Some((WatchKey::new(&key), stored.into_watch())),
            Ok(_) => {
                warn!(key = %key, "Skipping stored watch with zero threshold");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping undecodable stored watch");
                None
            }
        })
        .collect();
    Ok(watches)
}
