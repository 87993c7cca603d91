//! Cache Manager - An in-process caching layer
//!
//! Provides TTL expiry, size-bounded eviction (LRU, LFU or FIFO), namespaced keys,
//! glob-based bulk invalidation, cache-aside composition and hit/miss telemetry.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStats, EvictionStrategy, ManualClock, PatternDeletion};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
pub use manager::{CacheManager, CacheOptions, WarmItem};
pub use tasks::spawn_expiry_sweeper;
