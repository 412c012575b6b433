//! Target URL resolution.
//!
//! # Deployment modes
//! - Multi-origin: the absolute target comes from the `url` query parameter
//! - Fixed origin: the incoming path-and-query is appended to a configured origin
//!
//! # Design Decisions
//! - The literal target string is kept next to the parsed URL; the cache key
//!   is built from the literal form because `Url` normalises on parse
//! - Only http and https targets are accepted

use url::Url;

use crate::proxy::error::ValidationError;

/// A validated upstream target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    url: Url,
}

impl Target {
    /// Literal target as supplied by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed form used for the upstream call.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Parse an absolute http(s) URL.
pub fn parse_url(raw: &str) -> Result<Target, ValidationError> {
    let url = Url::parse(raw).map_err(|_| ValidationError::InvalidUrl)?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(Target {
            raw: raw.to_string(),
            url,
        }),
        _ => Err(ValidationError::InvalidUrl),
    }
}

/// Resolve a multi-origin target from the optional `url` parameter.
pub fn from_query(url_param: Option<&str>) -> Result<Target, ValidationError> {
    match url_param {
        None | Some("") => Err(ValidationError::MissingUrl),
        Some(raw) => parse_url(raw),
    }
}

/// Resolve a fixed-origin target: `origin` followed by `path_and_query`.
pub fn from_origin(origin: &str, path_and_query: &str) -> Result<Target, ValidationError> {
    let origin = origin.trim_end_matches('/');
    let path = if path_and_query.starts_with('/') {
        path_and_query.to_string()
    } else {
        format!("/{}", path_and_query)
    };
    parse_url(&format!("{}{}", origin, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url() {
        assert_eq!(from_query(None), Err(ValidationError::MissingUrl));
        assert_eq!(from_query(Some("")), Err(ValidationError::MissingUrl));
    }

    #[test]
    fn test_invalid_url() {
        assert_eq!(from_query(Some("not-a-url")), Err(ValidationError::InvalidUrl));
        assert_eq!(from_query(Some("invalid-url")), Err(ValidationError::InvalidUrl));
        assert_eq!(parse_url("ftp://files.example.com/a"), Err(ValidationError::InvalidUrl));
        assert_eq!(parse_url("http://"), Err(ValidationError::InvalidUrl));
    }

    #[test]
    fn test_literal_form_is_preserved() {
        let target = parse_url("HTTPS://API.example.com/users?b=2&a=1").unwrap();
        assert_eq!(target.as_str(), "HTTPS://API.example.com/users?b=2&a=1");
        assert_eq!(target.url().host_str(), Some("api.example.com"));
    }

    #[test]
    fn test_fixed_origin_join() {
        let target = from_origin("http://localhost:3000/", "/users?id=7").unwrap();
        assert_eq!(target.as_str(), "http://localhost:3000/users?id=7");

        let target = from_origin("http://localhost:3000", "/").unwrap();
        assert_eq!(target.as_str(), "http://localhost:3000/");
    }
}
