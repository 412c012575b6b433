//! Cache key derivation.
//!
//! # Responsibilities
//! - Map (target, method) to a deterministic key
//! - Keep non-default methods apart from the default-method key
//!
//! # Design Decisions
//! - Target is used literally: no percent-decoding, no query reordering.
//!   `http://x/?a=1&b=2` and `http://x/?b=2&a=1` are distinct keys.
//! - Method comparison against the default is case-insensitive

use std::fmt;

use axum::http::Method;

/// Opaque identifier of a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for `target` requested with `method`.
    ///
    /// The default method maps to the bare target; any other method appends
    /// `-<METHOD>`.
    pub fn build(target: &str, method: &Method, default_method: &Method) -> Self {
        if method.as_str().eq_ignore_ascii_case(default_method.as_str()) {
            Self(target.to_string())
        } else {
            Self(format!("{}-{}", target, method.as_str()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "https://api.example.com/users?page=2";

    #[test]
    fn test_default_method_uses_bare_target() {
        let key = CacheKey::build(TARGET, &Method::GET, &Method::GET);
        assert_eq!(key.as_str(), TARGET);
    }

    #[test]
    fn test_other_method_gets_suffix() {
        let key = CacheKey::build(TARGET, &Method::POST, &Method::GET);
        assert_eq!(key.as_str(), "https://api.example.com/users?page=2-POST");
        assert_ne!(key, CacheKey::build(TARGET, &Method::GET, &Method::GET));
    }

    #[test]
    fn test_default_comparison_ignores_case() {
        let lower = Method::from_bytes(b"get").unwrap();
        let key = CacheKey::build(TARGET, &lower, &Method::GET);
        assert_eq!(key.as_str(), TARGET);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = CacheKey::build(TARGET, &Method::DELETE, &Method::GET);
        let b = CacheKey::build(TARGET, &Method::DELETE, &Method::GET);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_query_normalization() {
        let a = CacheKey::build("http://x/?a=1&b=2", &Method::GET, &Method::GET);
        let b = CacheKey::build("http://x/?b=2&a=1", &Method::GET, &Method::GET);
        assert_ne!(a, b);
    }
}
