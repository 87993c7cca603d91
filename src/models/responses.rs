//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, PatternDeletion};

/// Response body for entry inspection (GET /entries/:key)
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    /// The requested logical key
    pub key: String,
    /// The stored JSON value
    pub value: serde_json::Value,
    /// Remaining lifetime in milliseconds
    pub ttl_remaining_ms: Option<u64>,
}

/// Response body for entry deletion (DELETE /entries/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for a full wipe (DELETE /entries)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    /// Entries present before the wipe
    pub cleared: usize,
}

/// Response body for the key listing (GET /keys)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for pattern invalidation (POST /invalidate)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// The namespaced glob that was applied
    pub pattern: String,
    pub deleted_count: usize,
    pub keys_deleted: Vec<String>,
}

impl InvalidateResponse {
    pub fn new(pattern: impl Into<String>, deletion: PatternDeletion) -> Self {
        Self {
            pattern: pattern.into(),
            deleted_count: deletion.deleted_count,
            keys_deleted: deletion.keys_deleted,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate in percent
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
