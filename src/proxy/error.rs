//! Proxy error taxonomy and its single mapping to HTTP replies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Rejections raised before a request reaches the cache or the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Invalid method")]
    InvalidMethod,
}

/// Failures below HTTP: nothing usable came back from the origin.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream request timed out after {0} ms")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Outcomes of the upstream call that the caller sees as failures.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Origin answered with a 5xx.
    #[error("{message}")]
    Status { status: StatusCode, message: String },
}

impl UpstreamError {
    /// Build the status variant with the caller-facing message for `status`.
    pub fn from_status(status: StatusCode) -> Self {
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal Server Error".to_string()
        } else {
            format!("Request failed with status code {}", status.as_u16())
        };
        UpstreamError::Status { status, message }
    }

    /// Status and message sent to the caller. Transport details stay in the logs.
    pub fn reply_parts(&self) -> (StatusCode, &str) {
        match self {
            UpstreamError::Transport(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            UpstreamError::Status { status, message } => (*status, message.as_str()),
        }
    }
}

/// JSON body used for every error reply.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.to_string() };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::MissingUrl.to_string(), "URL is required");
        assert_eq!(ValidationError::InvalidUrl.to_string(), "Invalid URL");
    }

    #[test]
    fn test_transport_errors_are_not_leaked() {
        let err = UpstreamError::from(TransportError::Connect("dns error: no such host".into()));
        let (status, message) = err.reply_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal Server Error");
    }

    #[test]
    fn test_status_error_messages() {
        let err = UpstreamError::from_status(StatusCode::BAD_GATEWAY);
        assert_eq!(err.reply_parts(), (StatusCode::BAD_GATEWAY, "Request failed with status code 502"));

        let err = UpstreamError::from_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.reply_parts(), (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"));
    }

    #[test]
    fn test_validation_into_response() {
        let response = ValidationError::InvalidUrl.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
