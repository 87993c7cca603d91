//! Cache Manager
//!
//! Public façade over a [`CacheBackend`]: key validation and namespacing, typed
//! (JSON-serialized) values, cache-aside composition, warming, telemetry and the
//! expiry sweeper's lifecycle.
//!
//! Every operation fails open. Internal errors are logged and turned into a miss,
//! `false` or an empty result; the only error a caller ever sees is the one its own
//! `get_or_set` fetcher returns.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    key, CacheBackend, CacheStats, Clock, KeyPattern, MemoryBackend, PatternDeletion,
};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::spawn_expiry_sweeper;

static GLOBAL: OnceLock<Arc<CacheManager>> = OnceLock::new();

// == Cache Options ==
/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL in seconds; `None` or zero means the manager default
    pub ttl: Option<u64>,
    /// Namespace for this call; `None` means the manager default
    pub namespace: Option<String>,
}

impl CacheOptions {
    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            ttl: Some(ttl_secs),
            namespace: None,
        }
    }

    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            ttl: None,
            namespace: Some(namespace.into()),
        }
    }

    pub fn ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl = Some(ttl_secs);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

// == Warm Item ==
/// One entry to preload with [`CacheManager::warm`].
#[derive(Debug, Clone)]
pub struct WarmItem<T> {
    pub key: String,
    pub value: T,
    /// TTL in seconds; `None` means the manager default
    pub ttl: Option<u64>,
    pub namespace: Option<String>,
}

impl<T> WarmItem<T> {
    pub fn new(key: impl Into<String>, value: T, ttl: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
            namespace: None,
        }
    }
}

// == Cache Manager ==
/// Process-wide cache façade.
///
/// Construct one explicitly and share it (`Arc<CacheManager>`), or use
/// [`CacheManager::global`] for a lazily created process-wide instance.
pub struct CacheManager {
    backend: Arc<dyn CacheBackend>,
    namespace: RwLock<String>,
    default_ttl_secs: u64,
    check_interval: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CacheManager {
    // == Constructors ==
    /// Creates a manager over an in-memory backend. The sweeper is not started.
    pub fn new(config: CacheConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new(&config));
        Self::with_backend(config, backend)
    }

    /// Creates a manager whose in-memory store reads time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let backend = Arc::new(MemoryBackend::with_clock(&config, clock));
        Self::with_backend(config, backend)
    }

    /// Creates a manager over any backend.
    pub fn with_backend(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            namespace: RwLock::new(config.namespace),
            default_ttl_secs: if config.default_ttl_secs == 0 {
                crate::config::DEFAULT_TTL_SECS
            } else {
                config.default_ttl_secs
            },
            check_interval: config.check_interval,
            sweeper: Mutex::new(None),
        }
    }

    // == Global Instance ==
    /// Process-wide instance with default configuration, created on first use.
    pub fn global() -> Arc<CacheManager> {
        Self::init_global(CacheConfig::default())
    }

    /// Creates the process-wide instance from `config`, or returns the existing one.
    ///
    /// The sweeper starts if a Tokio runtime is available at creation time.
    pub fn init_global(config: CacheConfig) -> Arc<CacheManager> {
        GLOBAL
            .get_or_init(|| {
                let manager = Arc::new(CacheManager::new(config));
                manager.spawn_sweeper();
                manager
            })
            .clone()
    }

    // == Sweeper Lifecycle ==
    /// Starts the expiry sweeper on the current Tokio runtime.
    ///
    /// Returns false if it is already running or no runtime is available.
    pub fn spawn_sweeper(&self) -> bool {
        let mut sweeper = self.sweeper.lock();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        if Handle::try_current().is_err() {
            warn!("no tokio runtime available, expiry sweeper not started");
            return false;
        }

        *sweeper = Some(spawn_expiry_sweeper(self.backend.clone(), self.check_interval));
        true
    }

    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the sweeper and wipes every entry.
    ///
    /// The sweeper is cancelled at most once; later calls only clear.
    pub async fn destroy(&self) {
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            info!("expiry sweeper stopped");
        }
        self.clear().await;
        info!("cache manager destroyed");
    }

    // == Namespace ==
    /// Changes the namespace used by calls that do not name one.
    pub fn set_namespace(&self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        debug!(namespace = %namespace, "default namespace changed");
        *self.namespace.write() = namespace;
    }

    pub fn namespace(&self) -> String {
        self.namespace.read().clone()
    }

    fn resolve(&self, key: &str, opts: &CacheOptions) -> Result<String> {
        key::validate(key)?;
        Ok(match &opts.namespace {
            Some(ns) => key::compose(key, Some(ns)),
            None => key::compose(key, Some(self.namespace.read().as_str())),
        })
    }

    fn effective_ttl(&self, ttl: Option<u64>) -> u64 {
        match ttl {
            Some(ttl) if ttl > 0 => ttl,
            _ => self.default_ttl_secs,
        }
    }

    // == Get ==
    /// Returns the cached value, or `None` on a miss or any internal failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, opts: &CacheOptions) -> Option<T> {
        match self.try_get(key, opts).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "cache get failed");
                None
            }
        }
    }

    async fn try_get<T: DeserializeOwned>(
        &self,
        key: &str,
        opts: &CacheOptions,
    ) -> Result<Option<T>> {
        let full_key = self.resolve(key, opts)?;
        let Some(bytes) = self.backend.get(&full_key).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %full_key, error = %e, "cached value does not decode, discarding");
                self.backend.reject(&full_key, &bytes).await?;
                Ok(None)
            }
        }
    }

    /// Returns the raw JSON value stored under `key`.
    pub async fn get_json(&self, key: &str, opts: &CacheOptions) -> Option<serde_json::Value> {
        self.get(key, opts).await
    }

    // == Set ==
    /// Stores `value`, returning whether it was cached.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        opts: &CacheOptions,
    ) -> bool {
        match self.try_set(key, value, opts).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "cache set failed");
                false
            }
        }
    }

    async fn try_set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        opts: &CacheOptions,
    ) -> Result<()> {
        let full_key = self.resolve(key, opts)?;
        let bytes = serde_json::to_vec(value)?;
        let ttl = self.effective_ttl(opts.ttl);
        self.backend.set(&full_key, bytes, ttl).await?;
        debug!(key = %full_key, ttl_secs = ttl, "cache set");
        Ok(())
    }

    // == Delete ==
    /// Removes one entry, returning whether it existed.
    pub async fn delete(&self, key: &str, opts: &CacheOptions) -> bool {
        let result = match self.resolve(key, opts) {
            Ok(full_key) => self.backend.delete(&full_key).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "cache delete failed");
            false
        })
    }

    // == Delete By Pattern ==
    /// Removes every entry in the namespace whose key matches the glob `pattern`.
    pub async fn delete_by_pattern(&self, pattern: &str, opts: &CacheOptions) -> PatternDeletion {
        match self.try_delete_by_pattern(pattern, opts).await {
            Ok(deletion) => {
                info!(
                    pattern = %pattern,
                    deleted = deletion.deleted_count,
                    "deleted cache entries by pattern"
                );
                deletion
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "cache pattern delete failed");
                PatternDeletion::default()
            }
        }
    }

    async fn try_delete_by_pattern(
        &self,
        pattern: &str,
        opts: &CacheOptions,
    ) -> Result<PatternDeletion> {
        key::validate(pattern)?;
        let namespace = opts
            .namespace
            .clone()
            .unwrap_or_else(|| self.namespace());
        let compiled = KeyPattern::namespaced(pattern, Some(&namespace))?;
        self.backend.delete_by_pattern(&compiled).await
    }

    // == Get Or Set ==
    /// Cache-aside lookup.
    ///
    /// On a hit the cached value is returned and `fetcher` is not called. On a miss
    /// `fetcher` runs (with no cache lock held) and its value is stored. If the cache
    /// itself fails, `fetcher` is called and its value returned uncached. Errors from
    /// `fetcher` are returned unchanged.
    ///
    /// Concurrent calls for the same missing key each run their own fetcher; there is
    /// no request coalescing.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        opts: &CacheOptions,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match self.try_get::<T>(key, opts).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "cache lookup failed, fetching uncached");
                return fetcher().await;
            }
        }

        let value = fetcher().await?;
        if let Err(e) = self.try_set(key, &value, opts).await {
            warn!(key = %key, error = %e, "failed to cache fetched value");
        }
        Ok(value)
    }

    // == Warm ==
    /// Preloads entries, continuing past failures. Returns how many were stored.
    pub async fn warm<T, I>(&self, items: I) -> usize
    where
        T: Serialize,
        I: IntoIterator<Item = WarmItem<T>>,
    {
        let mut warmed = 0;
        let mut failed = 0;

        for item in items {
            let opts = CacheOptions {
                ttl: item.ttl,
                namespace: item.namespace,
            };
            match self.try_set(&item.key, &item.value, &opts).await {
                Ok(()) => warmed += 1,
                Err(e) => {
                    failed += 1;
                    warn!(key = %item.key, error = %e, "failed to warm cache entry");
                }
            }
        }

        info!(warmed, failed, "cache warming complete");
        warmed
    }

    // == Introspection ==
    /// Returns true if a live entry exists. Does not count as a hit or miss.
    pub async fn exists(&self, key: &str, opts: &CacheOptions) -> bool {
        let result = match self.resolve(key, opts) {
            Ok(full_key) => self.backend.exists(&full_key).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "cache exists check failed");
            false
        })
    }

    /// Remaining lifetime of a live entry.
    pub async fn ttl_remaining(&self, key: &str, opts: &CacheOptions) -> Option<Duration> {
        let result = match self.resolve(key, opts) {
            Ok(full_key) => self.backend.ttl_remaining(&full_key).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "cache ttl lookup failed");
            None
        })
    }

    /// Snapshot of every stored full key, expired entries included.
    pub async fn keys(&self) -> Vec<String> {
        self.backend.keys().await.unwrap_or_else(|e| {
            warn!(error = %e, "cache keys snapshot failed");
            Vec::new()
        })
    }

    // == Clear ==
    /// Removes every entry in every namespace.
    pub async fn clear(&self) {
        match self.backend.clear().await {
            Ok(()) => info!("cache cleared"),
            Err(e) => warn!(error = %e, "cache clear failed"),
        }
    }

    // == Stats ==
    /// Current counters; zeroed if the backend cannot report them.
    pub async fn stats(&self) -> CacheStats {
        self.backend.stats().await.unwrap_or_else(|e| {
            warn!(error = %e, "cache stats unavailable");
            CacheStats::default()
        })
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}
