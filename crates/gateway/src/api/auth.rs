use axum::http::HeaderMap;

use breakwater_core::Session;

use crate::error::GatewayError;
use crate::state::AppState;

/// Extract and validate the bearer session token carried in `Authorization`
/// (§4.1). Shared by every endpoint that requires an active session.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Session, GatewayError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| GatewayError::Auth("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| GatewayError::Auth("Authorization header is not valid UTF-8".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| GatewayError::Auth("Authorization header must be a bearer token".to_string()))?;

    state
        .sessions
        .validate_token(token)
        .ok_or_else(|| GatewayError::Auth("session is missing, expired, or revoked".to_string()))
}
