//! Persistence of settings and history.
//!
//! The client does not care where state lives; shells plug in a
//! [`KeyValueStore`] (the CLI writes files, tests use [`MemoryStore`]).
//! Values are JSON text under two fixed keys.

use async_trait::async_trait;
use clipsync_core::HistoryCache;
use clipsync_types::{HistoryItem, Settings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key holding the serialized [`Settings`].
pub const SETTINGS_KEY: &str = "clipsync_settings";

/// Key holding the serialized history, newest first.
pub const HISTORY_KEY: &str = "clipsync_history";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage failed.
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// A value could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// String key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read a value. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load settings, merging stored fields over defaults.
///
/// A corrupt record is logged and replaced by defaults.
pub async fn load_settings(store: &dyn KeyValueStore) -> Result<Settings, StoreError> {
    let Some(raw) = store.get(SETTINGS_KEY).await? else {
        return Ok(Settings::default());
    };
    match serde_json::from_str(&raw) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(error = %e, "stored settings are corrupt, using defaults");
            Ok(Settings::default())
        }
    }
}

/// Persist settings.
pub async fn save_settings(
    store: &dyn KeyValueStore,
    settings: &Settings,
) -> Result<(), StoreError> {
    let raw =
        serde_json::to_string(settings).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.set(SETTINGS_KEY, &raw).await
}

/// Load history. A corrupt record is logged and treated as empty.
pub async fn load_history(store: &dyn KeyValueStore) -> Result<HistoryCache, StoreError> {
    let Some(raw) = store.get(HISTORY_KEY).await? else {
        return Ok(HistoryCache::new());
    };
    match serde_json::from_str::<Vec<HistoryItem>>(&raw) {
        Ok(items) => Ok(HistoryCache::from_items(items)),
        Err(e) => {
            tracing::warn!(error = %e, "stored history is corrupt, starting empty");
            Ok(HistoryCache::new())
        }
    }
}

/// Persist history, newest first.
pub async fn save_history(
    store: &dyn KeyValueStore,
    history: &HistoryCache,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(&history.to_vec())
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.set(HISTORY_KEY, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_types::ItemKind;

    #[tokio::test]
    async fn missing_keys_give_defaults() {
        let store = MemoryStore::new();
        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings.server_url, "ws://localhost:4000");
        assert!(load_history(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settings_persist() {
        let store = MemoryStore::new();
        let settings = Settings::default()
            .with_device_name("desk")
            .with_secret_key("x");
        save_settings(&store, &settings).await.unwrap();

        let loaded = load_settings(&store).await.unwrap();
        assert_eq!(loaded, settings);

        let raw = store.get(SETTINGS_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"deviceName\":\"desk\""));
    }

    #[tokio::test]
    async fn partial_settings_merge_over_defaults() {
        let store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, r#"{"serverUrl":"ws://relay.lan:4000"}"#)
            .await
            .unwrap();

        let loaded = load_settings(&store).await.unwrap();
        assert_eq!(loaded.server_url, "ws://relay.lan:4000");
        assert!(loaded.enable_sound);
    }

    #[tokio::test]
    async fn corrupt_settings_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(SETTINGS_KEY, "{not json").await.unwrap();
        let loaded = load_settings(&store).await.unwrap();
        assert_eq!(loaded.server_url, "ws://localhost:4000");
    }

    #[tokio::test]
    async fn history_persists_newest_first() {
        let store = MemoryStore::new();
        let mut history = HistoryCache::new();
        history.push(HistoryItem::sent(ItemKind::Text, "old".into(), "me", 1, None));
        history.push(HistoryItem::sent(ItemKind::Text, "new".into(), "me", 2, None));
        save_history(&store, &history).await.unwrap();

        let loaded = load_history(&store).await.unwrap();
        let contents: Vec<_> = loaded.iter().map(|i| i.content.clone()).collect();
        assert_eq!(contents, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn memory_store_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").await.unwrap();
        assert_eq!(b.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
