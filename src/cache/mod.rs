//! Cache Module
//!
//! Storage layer of the cache manager: key codec, glob matcher, entry store,
//! eviction ranking, clocks and the backend seam.

mod backend;
mod clock;
mod entry;
mod eviction;
pub mod key;
pub mod pattern;
mod stats;
mod store;


// Re-export public types
pub use backend::{CacheBackend, MemoryBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use eviction::EvictionStrategy;
pub use key::MAX_KEY_LENGTH;
pub use pattern::KeyPattern;
pub use stats::CacheStats;
pub use store::{EntryStore, PatternDeletion};
