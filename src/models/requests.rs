//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::MAX_KEY_LENGTH;

/// Request body for pattern invalidation (POST /invalidate)
///
/// # Fields
/// - `pattern`: Glob over logical keys (`*` any run, `?` one character)
/// - `namespace`: Namespace to scope the pattern to (manager default if omitted)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        if self.pattern.chars().count() > MAX_KEY_LENGTH {
            return Some(format!(
                "Pattern exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Optional `?namespace=` query on entry routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceQuery {
    #[serde(default)]
    pub namespace: Option<String>,
}
