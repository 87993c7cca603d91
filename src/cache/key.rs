//! Key Codec
//!
//! Validates logical keys and composes them with a namespace prefix.

use crate::error::{CacheError, Result};

/// Maximum allowed key length in characters
pub const MAX_KEY_LENGTH: usize = 512;

/// Separator between namespace and logical key
pub const NAMESPACE_SEPARATOR: char = ':';

// == Validate ==
/// Rejects empty keys and keys longer than [`MAX_KEY_LENGTH`] characters.
pub fn validate(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }

    let length = key.chars().count();
    if length > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key length {} exceeds maximum of {} characters",
            length, MAX_KEY_LENGTH
        )));
    }

    Ok(())
}

// == Compose ==
/// Builds the stored key: `"{namespace}:{key}"`, or `key` when no namespace applies.
pub fn compose(key: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}{}{}", ns, NAMESPACE_SEPARATOR, key),
        _ => key.to_string(),
    }
}
