//! Proxy Error Types
//!
//! Defines error types for the forwarding layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Proxy error types
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The upstream request could not be completed (backend unreachable,
    /// connection reset, ...)
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The upstream websocket handshake failed
    #[error("Upstream websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),

    /// The upstream response could not be translated back to the client
    #[error("Failed to assemble proxied response: {0}")]
    Response(#[from] axum::http::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNREACHABLE"),
            ProxyError::Handshake(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_HANDSHAKE_FAILED"),
            ProxyError::Response(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "Proxy error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handshake_error_maps_to_bad_gateway() {
        let err = ProxyError::Handshake(tokio_tungstenite::tungstenite::Error::ConnectionClosed);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
