//! Configuration Module
//!
//! `CacheConfig` is handed to the cache manager at construction. `Config` wraps it
//! for the admin binary, which is the only place values are read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionStrategy;

/// Default maximum number of entries
pub const DEFAULT_MAX_SIZE: usize = 10_000;

/// Default memory budget in bytes (100 MiB)
pub const DEFAULT_MAX_MEMORY: usize = 100 * 1024 * 1024;

/// Default expiry sweeper period in milliseconds (5 minutes)
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 300_000;

/// Default time-to-live in seconds
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Default key namespace
pub const DEFAULT_NAMESPACE: &str = "cache";

// == Cache Config ==
/// Cache manager parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before eviction kicks in
    pub max_size: usize,
    /// Memory budget in bytes, summed over approximate entry sizes
    pub max_memory: usize,
    /// Ranking used to pick eviction victims
    pub strategy: EvictionStrategy,
    /// Period of the expiry sweeper
    pub check_interval: Duration,
    /// TTL applied when a caller does not supply one
    pub default_ttl_secs: u64,
    /// Namespace prefixed to keys when a call does not name one
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_memory: DEFAULT_MAX_MEMORY,
            strategy: EvictionStrategy::default(),
            check_interval: Duration::from_millis(DEFAULT_CHECK_INTERVAL_MS),
            default_ttl_secs: DEFAULT_TTL_SECS,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

// == Binary Config ==
/// Admin server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache parameters
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 10000)
    /// - `CACHE_MAX_MEMORY` - Memory budget in bytes (default: 100 MiB)
    /// - `CACHE_STRATEGY` - `lru`, `lfu` or `fifo` (default: lru)
    /// - `CACHE_CHECK_INTERVAL_MS` - Sweeper period in milliseconds (default: 300000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_NAMESPACE` - Default key namespace (default: cache)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CacheConfig::default();

        let cache = CacheConfig {
            max_size: parse_var(&lookup, "CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            max_memory: parse_var(&lookup, "CACHE_MAX_MEMORY").unwrap_or(defaults.max_memory),
            strategy: parse_var(&lookup, "CACHE_STRATEGY").unwrap_or(defaults.strategy),
            check_interval: parse_var(&lookup, "CACHE_CHECK_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.check_interval),
            default_ttl_secs: parse_var(&lookup, "CACHE_DEFAULT_TTL")
                .filter(|ttl: &u64| *ttl > 0)
                .unwrap_or(defaults.default_ttl_secs),
            namespace: lookup("CACHE_NAMESPACE").unwrap_or(defaults.namespace),
        };

        Self {
            cache,
            server_port: parse_var(&lookup, "SERVER_PORT").unwrap_or(3000),
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
        }
    }
}
