//! Eviction Engine
//!
//! Ranks entries by the configured strategy and picks the ones to drop when an
//! insertion would exceed capacity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::error::CacheError;

/// Share of current entries removed per eviction pass, in percent
pub(crate) const EVICTION_PERCENT: usize = 10;

// == Eviction Strategy ==
/// Ranking used to choose eviction victims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Oldest `last_accessed_at` first
    #[default]
    Lru,
    /// Fewest `hits` first
    Lfu,
    /// Oldest `created_at` first
    Fifo,
}

impl EvictionStrategy {
    // == Rank Key ==
    /// Sort key for an entry; smaller keys are evicted first.
    ///
    /// The trailing sequence number breaks ties deterministically.
    fn rank(&self, entry: &CacheEntry) -> (u64, u64) {
        match self {
            EvictionStrategy::Lru => (entry.last_accessed_at, entry.accessed_seq),
            EvictionStrategy::Lfu => (entry.hits, entry.accessed_seq),
            EvictionStrategy::Fifo => (entry.created_at, entry.inserted_seq),
        }
    }

    // == Select Victims ==
    /// Returns up to `count` keys, lowest rank first.
    pub fn select_victims<'a, I>(&self, entries: I, count: usize) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a String, &'a CacheEntry)>,
    {
        let mut ranked: Vec<((u64, u64), &String)> = entries
            .into_iter()
            .map(|(key, entry)| (self.rank(entry), key))
            .collect();
        ranked.sort_unstable_by_key(|(rank, _)| *rank);

        ranked
            .into_iter()
            .take(count)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::Lfu => "lfu",
            EvictionStrategy::Fifo => "fifo",
        }
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "lfu" => Ok(EvictionStrategy::Lfu),
            "fifo" => Ok(EvictionStrategy::Fifo),
            other => Err(CacheError::InvalidRequest(format!(
                "unknown eviction strategy: {}",
                other
            ))),
        }
    }
}

// == Eviction Count ==
/// Number of entries to evict from a store holding `len` entries:
/// ten percent rounded up, at least one, never more than `len`.
pub(crate) fn eviction_count(len: usize) -> usize {
    let count = (len * EVICTION_PERCENT).div_ceil(100).max(1);
    count.min(len)
}
