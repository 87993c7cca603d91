//! Cache Statistics Module
//!
//! Tracks hit/miss telemetry and capacity figures for the entry store.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache counters and capacity figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key absent or expired)
    pub misses: u64,
    /// Number of entries removed under capacity pressure
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries in the store
    pub entries: usize,
    /// Configured entry capacity
    pub max_size: usize,
    /// Sum of approximate entry sizes in bytes
    pub current_size: usize,
    /// Configured memory budget in bytes
    pub max_memory: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Percentage of reads that hit, rounded to two decimals.
    ///
    /// Returns 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            let rate = self.hits as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Moves one already counted hit over to the misses.
    pub fn reclassify_hit_as_miss(&mut self) {
        self.hits = self.hits.saturating_sub(1);
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}
