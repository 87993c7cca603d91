//! API Routes
//!
//! Configures the Axum router with the admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_entry_handler, get_entry_handler, health_handler, invalidate_handler,
    keys_handler, stats_handler, AppState,
};

/// Creates the admin router.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Cache statistics
/// - `GET /keys` - Stored key snapshot
/// - `GET /entries/:key` - Inspect one entry (`?namespace=` optional)
/// - `DELETE /entries/:key` - Delete one entry (`?namespace=` optional)
/// - `DELETE /entries` - Clear the cache
/// - `POST /invalidate` - Delete by glob pattern
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/entries", delete(clear_handler))
        .route(
            "/entries/:key",
            get(get_entry_handler).delete(delete_entry_handler),
        )
        .route("/invalidate", post(invalidate_handler))
        .route("/keys", get(keys_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
