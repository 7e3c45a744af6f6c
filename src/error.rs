//! Typed service errors and their HTTP mapping.
//!
//! A failed upstream call is always surfaced as a typed error, never as a
//! fabricated zero-value snapshot; callers must be able to tell "no data"
//! apart from "zero congestion".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::fmt;

/// Service error taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Upstream sampling endpoint unreachable or returned an error envelope.
    SourceUnavailable(String),
    /// Upstream returned zero usable samples where at least one was required.
    InsufficientData,
    /// No successful poll has completed yet.
    SnapshotUnavailable,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::SourceUnavailable(reason) => {
                write!(f, "Could not connect to Solana RPC: {}", reason)
            }
            ServiceError::InsufficientData => {
                write!(f, "Solana RPC returned no usable performance samples")
            }
            ServiceError::SnapshotUnavailable => {
                write!(f, "No network snapshot available yet")
            }
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Whether the failure originated at the RPC boundary (surfaced to the
    /// dashboard so it can show an endpoint-configuration hint).
    pub fn is_rpc_error(&self) -> bool {
        matches!(
            self,
            ServiceError::SourceUnavailable(_) | ServiceError::InsufficientData
        )
    }
}

/// HTTP-facing error: an endpoint-specific message wrapping the underlying
/// service failure, mirroring the body shape the dashboard expects.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    source: Option<ServiceError>,
}

impl ApiError {
    pub fn unavailable(message: &str, source: ServiceError) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.to_string(),
            source: Some(source),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
            source: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self.source {
            Some(err) => json!({
                "message": self.message,
                "error": err.to_string(),
                "isRpcError": err.is_rpc_error(),
            }),
            None => json!({ "message": self.message }),
        };

        (self.status, Json(body)).into_response()
    }
}
