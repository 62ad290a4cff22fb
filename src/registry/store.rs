//! Stream registry implementation
//!
//! Concurrency-safe directory from stream key to relay.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::error::RegistryError;
use super::key::StreamKey;
use super::relay::Relay;
use crate::stats::RelayStats;

/// Directory of active relays
///
/// Thread-safe via `RwLock`. Lookups for subscribe requests share the read
/// lock; creation and removal take the write lock, which makes
/// `get_or_create` atomic per key.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    relays: RwLock<HashMap<StreamKey, Arc<Relay>>>,
}

impl StreamRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the relay for `key`, creating it if absent
    ///
    /// The flag is `true` if the relay already existed. Of several concurrent
    /// callers for the same key exactly one sees `false`.
    pub async fn get_or_create(&self, key: &StreamKey) -> (Arc<Relay>, bool) {
        let mut relays = self.relays.write().await;

        if let Some(relay) = relays.get(key) {
            return (Arc::clone(relay), true);
        }

        let relay = Arc::new(Relay::new(key.clone()));
        relays.insert(key.clone(), Arc::clone(&relay));

        tracing::info!(stream = %key, streams = relays.len(), "Relay created");
        (relay, false)
    }

    /// Find the relay for `key`
    pub async fn lookup(&self, key: &StreamKey) -> Result<Arc<Relay>, RegistryError> {
        self.relays
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::StreamNotFound(key.clone()))
    }

    /// Remove `relay` from the registry
    ///
    /// Only removes the entry if `key` still maps to this very relay, so a
    /// stale disconnect cannot evict a newer relay under the same key.
    pub async fn remove(&self, key: &StreamKey, relay: &Arc<Relay>) -> bool {
        let mut relays = self.relays.write().await;

        match relays.get(key) {
            Some(current) if Arc::ptr_eq(current, relay) => {
                relays.remove(key);
                tracing::info!(stream = %key, streams = relays.len(), "Relay removed");
                true
            }
            _ => {
                tracing::debug!(stream = %key, "Relay already replaced or removed");
                false
            }
        }
    }

    /// Number of registered relays
    pub async fn stream_count(&self) -> usize {
        self.relays.read().await.len()
    }

    /// Keys of all registered relays, sorted
    pub async fn stream_keys(&self) -> Vec<StreamKey> {
        let mut keys: Vec<StreamKey> = self.relays.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Statistics for one relay
    pub async fn stream_stats(&self, key: &StreamKey) -> Option<RelayStats> {
        let relay = self.lookup(key).await.ok()?;
        Some(relay.stats().await)
    }
}
