//! API Module
//!
//! Admin HTTP surface over a shared cache manager: inspection, invalidation and
//! telemetry. There is no write endpoint; values are only produced in-process.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
