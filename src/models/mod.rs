//! Request and Response models for the admin API
//!
//! DTOs used to serialize/deserialize HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{InvalidateRequest, NamespaceQuery};
pub use responses::{
    ClearResponse, DeleteResponse, EntryResponse, HealthResponse, InvalidateResponse,
    KeysResponse, StatsResponse,
};
