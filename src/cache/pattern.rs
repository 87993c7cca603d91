//! Pattern Matcher
//!
//! Turns a restricted glob (`*` = any run, `?` = one character) into an anchored regex.
//! Every other character is escaped first, so regex metacharacters in keys only ever
//! match themselves.

use regex::Regex;

use crate::cache::key::NAMESPACE_SEPARATOR;
use crate::error::{CacheError, Result};

// == Key Pattern ==
/// Compiled, anchored key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compiles a glob pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::compile(pattern.to_string(), glob_to_regex(pattern))
    }

    /// Compiles a glob pattern scoped to a namespace.
    ///
    /// The namespace is matched literally even if it contains `*` or `?`.
    pub fn namespaced(pattern: &str, namespace: Option<&str>) -> Result<Self> {
        match namespace {
            Some(ns) if !ns.is_empty() => {
                let body = format!(
                    "{}{}{}",
                    regex::escape(ns),
                    regex::escape(&NAMESPACE_SEPARATOR.to_string()),
                    glob_body(pattern)
                );
                Self::compile(
                    format!("{}{}{}", ns, NAMESPACE_SEPARATOR, pattern),
                    anchored(&body),
                )
            }
            _ => Self::new(pattern),
        }
    }

    fn compile(source: String, expr: String) -> Result<Self> {
        let regex = Regex::new(&expr)
            .map_err(|e| CacheError::Internal(format!("invalid key pattern {:?}: {}", source, e)))?;
        Ok(Self { source, regex })
    }

    /// Returns true if the whole key matches.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The glob this pattern was built from, including any namespace prefix.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

// == Matches ==
/// One-shot match of `key` against a glob `pattern`.
pub fn matches(key: &str, pattern: &str) -> bool {
    KeyPattern::new(pattern)
        .map(|p| p.matches(key))
        .unwrap_or(false)
}

// == Glob Conversion ==
/// Converts a glob into an anchored regular expression.
pub fn glob_to_regex(pattern: &str) -> String {
    anchored(&glob_body(pattern))
}

fn anchored(body: &str) -> String {
    format!("(?s)^{}$", body)
}

fn glob_body(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut literal = String::new();

    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}
