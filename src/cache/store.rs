//! Entry Store Module
//!
//! Bounded key/value table with TTL expiry, memory accounting and strategy-driven
//! eviction. The store is a plain data structure; callers share it behind a lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::eviction::eviction_count;
use crate::cache::{CacheEntry, CacheStats, Clock, EvictionStrategy, KeyPattern, SystemClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Pattern Deletion ==
/// Outcome of a bulk pattern delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatternDeletion {
    /// Number of entries removed
    pub deleted_count: usize,
    /// Full keys of the removed entries
    pub keys_deleted: Vec<String>,
}

// == Entry Store ==
/// Main cache storage with eviction and TTL support.
#[derive(Debug)]
pub struct EntryStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance counters
    stats: CacheStats,
    /// Sum of entry sizes in bytes
    current_size: usize,
    /// Maximum number of entries before eviction
    max_size: usize,
    /// Memory budget in bytes
    max_memory: usize,
    /// Victim ranking
    strategy: EvictionStrategy,
    /// Time source for all entry timestamps
    clock: Arc<dyn Clock>,
    /// Monotonic counter for deterministic eviction ties
    sequence: u64,
}

impl EntryStore {
    // == Constructor ==
    /// Creates a store using the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store reading time from `clock`.
    ///
    /// A `max_size` of zero is treated as one.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            current_size: 0,
            max_size: config.max_size.max(1),
            max_memory: config.max_memory,
            strategy: config.strategy,
            clock,
            sequence: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    // == Get ==
    /// Retrieves a value by key, counting a hit or a miss.
    ///
    /// Expired entries are removed on the way and reported as misses.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                debug!(key = %key, "cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!(key = %key, "cache miss (expired)");
            return None;
        }

        let seq = self.next_seq();
        let entry = self.entries.get_mut(key)?;
        entry.record_access(now, seq);
        self.stats.record_hit();
        debug!(key = %key, hits = entry.hits, "cache hit");
        Some(entry.value.clone())
    }

    // == Set ==
    /// Stores a value for `ttl_secs` seconds, replacing any previous entry.
    ///
    /// Eviction runs first if the new entry would exceed the entry or memory budget.
    /// Insertion always succeeds; if eviction cannot free anything the store is
    /// allowed to run over budget. Returns the number of evicted entries.
    pub fn set(&mut self, key: String, value: Vec<u8>, ttl_secs: u64) -> usize {
        let size = value.len();

        self.remove_entry(&key);

        let mut evicted = 0;
        if self.needs_eviction(size) {
            match self.evict() {
                Ok(count) => evicted = count,
                Err(e) => warn!(key = %key, error = %e, "eviction skipped, store over budget"),
            }
        }

        let now = self.clock.now_ms();
        let seq = self.next_seq();
        let entry = CacheEntry::new(value, now, ttl_secs.saturating_mul(1000), seq);
        self.current_size += entry.size;
        self.entries.insert(key, entry);

        evicted
    }

    /// Either bound alone triggers eviction; the entry count never passes `max_size`.
    fn needs_eviction(&self, incoming_size: usize) -> bool {
        self.entries.len() >= self.max_size
            || self.current_size.saturating_add(incoming_size) > self.max_memory
    }

    // == Evict ==
    /// Removes roughly ten percent of entries, ranked by the configured strategy.
    pub fn evict(&mut self) -> Result<usize> {
        let count = eviction_count(self.entries.len());
        let victims = self.strategy.select_victims(&self.entries, count);

        if victims.is_empty() {
            return Err(CacheError::Eviction(format!(
                "no {} victims available among {} entries",
                self.strategy,
                self.entries.len()
            )));
        }

        for key in &victims {
            self.remove_entry(key);
        }
        self.stats.record_evictions(victims.len());
        debug!(strategy = %self.strategy, evicted = victims.len(), "evicted entries");

        Ok(victims.len())
    }

    // == Reject ==
    /// Drops an entry whose payload the caller could not decode, turning the hit that
    /// returned it into a miss.
    ///
    /// Nothing is removed if the entry was replaced since `payload` was read.
    pub fn reject(&mut self, key: &str, payload: &[u8]) -> bool {
        if self.entries.get(key).map(|entry| entry.value.as_slice()) != Some(payload) {
            return false;
        }

        self.remove_entry(key);
        self.stats.reclassify_hit_as_miss();
        debug!(key = %key, "rejected undecodable entry");
        true
    }

    // == Delete ==
    /// Removes an entry by key, returning whether one was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Delete By Pattern ==
    /// Removes every stored key matching `pattern`.
    pub fn delete_by_pattern(&mut self, pattern: &KeyPattern) -> PatternDeletion {
        let keys_deleted: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        for key in &keys_deleted {
            self.remove_entry(key);
        }

        PatternDeletion {
            deleted_count: keys_deleted.len(),
            keys_deleted,
        }
    }

    // == Clear ==
    /// Empties the store. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_size = 0;
    }

    // == Keys ==
    /// Snapshot of every stored key, expired or not.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Contains ==
    /// Returns true if a live entry exists. Does not touch counters.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    // == TTL Remaining ==
    /// Remaining lifetime of a live entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| Duration::from_millis(entry.ttl_remaining_ms(now)))
    }

    // == Purge Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            max_size: self.max_size,
            current_size: self.current_size,
            max_memory: self.max_memory,
            ..self.stats.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.current_size = self.current_size.saturating_sub(entry.size);
        Some(entry)
    }
}
