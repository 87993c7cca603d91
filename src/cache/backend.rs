//! Cache Backend Module
//!
//! The manager talks to storage through [`CacheBackend`]. [`MemoryBackend`] wraps an
//! [`EntryStore`] in a single `RwLock`; it is the only backend shipped, the trait is the
//! seam a remote backend would plug into.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheStats, Clock, EntryStore, KeyPattern, PatternDeletion};
use crate::config::CacheConfig;
use crate::error::Result;

// == Backend Trait ==
/// Abstract cache storage.
///
/// Keys passed here are already validated and namespaced. Implementations must be
/// safe to share between tasks.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the payload for a live entry, counting a hit or miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores a payload for `ttl_secs` seconds.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()>;

    /// Drops an entry whose payload could not be decoded and counts the read that
    /// returned it as a miss. A no-op if the entry changed since `payload` was read.
    async fn reject(&self, key: &str, payload: &[u8]) -> Result<bool>;

    /// Removes one entry, reporting whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every entry whose key matches `pattern`.
    async fn delete_by_pattern(&self, pattern: &KeyPattern) -> Result<PatternDeletion>;

    /// Checks for a live entry without touching counters.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining lifetime of a live entry.
    async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>>;

    /// Snapshot of stored keys, expired ones included.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Removes all entries.
    async fn clear(&self) -> Result<()>;

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize>;

    /// Current counters and capacity figures.
    async fn stats(&self) -> Result<CacheStats>;
}

// == Memory Backend ==
/// In-process backend over a lock-protected [`EntryStore`].
#[derive(Debug)]
pub struct MemoryBackend {
    store: RwLock<EntryStore>,
}

impl MemoryBackend {
    pub fn new(config: &CacheConfig) -> Self {
        Self::from_store(EntryStore::new(config))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::from_store(EntryStore::with_clock(config, clock))
    }

    pub fn from_store(store: EntryStore) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        // Write lock: reads update hit counters and may drop expired entries
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        self.store
            .write()
            .await
            .set(key.to_string(), value, ttl_secs);
        Ok(())
    }

    async fn reject(&self, key: &str, payload: &[u8]) -> Result<bool> {
        Ok(self.store.write().await.reject(key, payload))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.store.write().await.delete(key))
    }

    async fn delete_by_pattern(&self, pattern: &KeyPattern) -> Result<PatternDeletion> {
        Ok(self.store.write().await.delete_by_pattern(pattern))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.read().await.contains(key))
    }

    async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.store.read().await.ttl_remaining(key))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.store.read().await.keys())
    }

    async fn clear(&self) -> Result<()> {
        self.store.write().await.clear();
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(self.store.write().await.purge_expired())
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(self.store.read().await.stats())
    }
}
