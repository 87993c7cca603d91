//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access metadata.

// == Cache Entry ==
/// A single stored value plus the metadata eviction and expiry need.
///
/// Timestamps are Unix milliseconds taken from the store's clock. The value is the
/// serialized payload; it is never mutated after insertion, so `size` stays accurate.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized payload
    pub value: Vec<u8>,
    /// Insertion time
    pub created_at: u64,
    /// Time at which the entry stops being visible
    pub expires_at: u64,
    /// Time of the most recent successful read (insertion counts as an access)
    pub last_accessed_at: u64,
    /// Successful reads since insertion
    pub hits: u64,
    /// Approximate byte size of the payload
    pub size: usize,
    /// Store-wide sequence number assigned at insertion
    pub(crate) inserted_seq: u64,
    /// Store-wide sequence number of the most recent access
    pub(crate) accessed_seq: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry that lives for `ttl_ms` milliseconds from `now`.
    ///
    /// A zero TTL is stretched to one millisecond so `expires_at > created_at` holds.
    pub fn new(value: Vec<u8>, now: u64, ttl_ms: u64, seq: u64) -> Self {
        let size = value.len();
        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms.max(1)),
            last_accessed_at: now,
            hits: 0,
            size,
            inserted_seq: seq,
            accessed_seq: seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    // == Record Access ==
    /// Counts a successful read.
    pub fn record_access(&mut self, now: u64, seq: u64) {
        self.hits += 1;
        self.last_accessed_at = now;
        self.accessed_seq = seq;
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}
