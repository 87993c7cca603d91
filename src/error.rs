//! Error types for the cache manager
//!
//! Internal layers return these errors; the `CacheManager` façade logs them and
//! degrades to a miss or a no-op instead of handing them to callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache manager.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or longer than the allowed maximum
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Eviction could not free any capacity
    #[error("Eviction failed: {0}")]
    Eviction(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key not found in cache (admin API only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data (admin API only)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal fault
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidKey(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Eviction(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache manager.
pub type Result<T> = std::result::Result<T, CacheError>;
