//! Error taxonomy for the gateway's HTTP surface (§7), mapping every
//! component error onto one of: `AuthError` (401), `PolicyDenied` (403),
//! `ConfigError` (500, redacted), `UpstreamError` (502), `NotFound` (404),
//! or `BadRequest` (400).
//!
//! Grounded on `acteon-server::error::ServerError`'s `IntoResponse` shape.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("approval denied")]
    PolicyDenied,

    /// Covers both operator misconfiguration and "the agent asked for
    /// credentials the gateway cannot produce" (§4.6 step 5) -- neither is
    /// safe to describe in detail to the caller.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<breakwater_session::SessionError> for GatewayError {
    fn from(e: breakwater_session::SessionError) -> Self {
        Self::Auth(e.to_string())
    }
}

impl From<breakwater_broker::BrokerError> for GatewayError {
    fn from(e: breakwater_broker::BrokerError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<breakwater_approval::ApprovalError> for GatewayError {
    fn from(_e: breakwater_approval::ApprovalError) -> Self {
        // Both `NotFound` and `AlreadyDecided` surface as 404: the external
        // interface table (§6) only documents 404 for the approval
        // endpoints, and a caller racing a second decision against an
        // already-terminal approval is not meaningfully different from one
        // naming an id that never existed.
        Self::NotFound
    }
}

impl From<breakwater_proxy::ProxyError> for GatewayError {
    fn from(e: breakwater_proxy::ProxyError) -> Self {
        match e {
            breakwater_proxy::ProxyError::Upstream(inner) => Self::Upstream(inner.to_string()),
            breakwater_proxy::ProxyError::UnsupportedProvider(p) => {
                Self::Config(format!("provider '{p}' is not supported on the forward path"))
            }
            breakwater_proxy::ProxyError::MethodNotAllowed(m) => {
                Self::BadRequest(format!("method '{m}' is not accepted"))
            }
            breakwater_proxy::ProxyError::InvalidHeader(msg) => Self::Config(msg),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::PolicyDenied => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal configuration error".to_string(),
            ),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream request failed".to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
