use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use breakwater_core::TenantId;

use crate::error::GatewayError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub tenant_id: String,
    pub enrollment_secret: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_token: String,
    pub ttl_seconds: i64,
    pub expires_at: String,
}

/// `POST /session/new` (§6, §4.1). Verifies the enrollment secret in
/// constant time and, on success, issues a bearer session token.
#[instrument(skip(state, body), fields(tenant_id = %body.tenant_id))]
pub async fn new_session(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let tenant_id = TenantId::from(body.tenant_id);
    state
        .sessions
        .verify_enrollment_detailed(&tenant_id, &body.enrollment_secret)
        .map_err(|e| GatewayError::Auth(e.to_string()))?;

    let (token, session) = state.sessions.create_session(tenant_id);
    let response = SessionResponse {
        session_token: token,
        ttl_seconds: (session.expires_at - session.created_at).num_seconds(),
        expires_at: session.expires_at.to_rfc3339(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}
