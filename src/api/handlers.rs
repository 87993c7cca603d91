//! API Handlers
//!
//! HTTP request handlers for the admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::key;
use crate::error::{CacheError, Result};
use crate::manager::{CacheManager, CacheOptions};
use crate::models::{
    ClearResponse, DeleteResponse, EntryResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse, KeysResponse, NamespaceQuery, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
}

impl AppState {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

fn options(query: NamespaceQuery) -> CacheOptions {
    CacheOptions {
        ttl: None,
        namespace: query.namespace,
    }
}

/// Handler for GET /entries/:key
///
/// Returns the stored JSON value. Counts as a cache read.
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<EntryResponse>> {
    key::validate(&key)?;
    let opts = options(query);

    let value = state
        .cache
        .get_json(&key, &opts)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    let ttl_remaining_ms = state
        .cache
        .ttl_remaining(&key, &opts)
        .await
        .map(|ttl| ttl.as_millis() as u64);

    Ok(Json(EntryResponse {
        key,
        value,
        ttl_remaining_ms,
    }))
}

/// Handler for DELETE /entries/:key
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<DeleteResponse>> {
    key::validate(&key)?;

    if state.cache.delete(&key, &options(query)).await {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for DELETE /entries
///
/// Wipes every namespace.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.cache.stats().await.entries;
    state.cache.clear().await;

    Json(ClearResponse {
        message: "Cache cleared".to_string(),
        cleared,
    })
}

/// Handler for POST /invalidate
///
/// Deletes every key in the namespace matching the glob.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let namespace = req
        .namespace
        .clone()
        .unwrap_or_else(|| state.cache.namespace());
    let applied = key::compose(&req.pattern, Some(&namespace));

    let opts = CacheOptions::in_namespace(namespace);
    let deletion = state.cache.delete_by_pattern(&req.pattern, &opts).await;

    Ok(Json(InvalidateResponse::new(applied, deletion)))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys().await))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
