//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, the origin URL, the default method
//! - Validate value ranges (timeouts and intervals > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::proxy::target::parse_url;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Invalid origin URL provided: '{0}'")]
    InvalidOrigin(String),

    #[error("cache.default_method: invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if let Some(origin) = &config.proxy.origin {
        if parse_url(origin).is_err() {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    let method = config.cache.default_method.to_ascii_uppercase();
    if method.is_empty() || Method::from_bytes(method.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidMethod(config.cache.default_method.clone()));
    }

    let positive = [
        ("upstream.timeout_ms", config.upstream.timeout_ms),
        ("cache.reap_interval_ms", config.cache.reap_interval_ms),
        ("listener.request_timeout_secs", config.listener.request_timeout_secs),
        ("listener.max_body_size", config.listener.max_body_size as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
