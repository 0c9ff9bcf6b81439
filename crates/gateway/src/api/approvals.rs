//! Approval decision and polling endpoints (§4.4, §4.7, §6).
//!
//! `approve`/`deny`/`status` accept either a bearer session (a decider
//! using the same client as the agent) or an HMAC-signed query string (a
//! decider clicking a notification link with no session of their own) --
//! grounded on `acteon-server::api::approvals`'s dual auth paths for the
//! same reason. `create` is session-only: only an enrolled tenant creates
//! approval requests in the first place.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use breakwater_core::{ActionType, ApprovalId, ApprovalStatus, RequestId};

use crate::api::auth::authenticate;
use crate::approval_keys::verify_approval_sig;
use crate::error::GatewayError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateApprovalRequest {
    pub command: String,
    pub args: String,
    pub classification: ActionType,
}

#[derive(Debug, Serialize)]
pub struct CreateApprovalResponse {
    pub id: ApprovalId,
}

/// `POST /approvals` -- create an approval request for a wrapper-mediated
/// CLI write (§4.7 step 2). Not tabulated in the external interfaces table
/// alongside the decision endpoints; see `DESIGN.md` for this Open
/// Question's resolution.
#[instrument(skip(state, body), fields(%body.command))]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateApprovalRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let session = authenticate(&state, &headers)?;
    let details = serde_json::json!({
        "command": body.command,
        "args": body.args,
        "classification": body.classification,
    });
    let id = state
        .approvals
        .request(session.tenant_id, RequestId::new(), details);
    Ok((StatusCode::CREATED, Json(CreateApprovalResponse { id })))
}

/// Absent for the plain Bearer-session decision path §6 documents; present
/// only when a decider arrives via an HMAC-signed notification link with no
/// session of their own.
#[derive(Debug, Deserialize, Default)]
pub struct SigQuery {
    pub sig: Option<String>,
    pub expires_at: Option<String>,
    pub kid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApprovalDecisionResponse {
    pub id: ApprovalId,
    pub status: ApprovalStatus,
}

#[derive(Debug, Serialize)]
pub struct ApprovalStatusResponse {
    pub id: ApprovalId,
    pub status: ApprovalStatus,
    pub created_at: String,
    pub expires_at: String,
    pub decided_at: Option<String>,
    pub decided_by: Option<String>,
}

/// Bearer-session deciders and HMAC-link deciders both land here; bearer
/// auth is tried first since it is cheap and always present for an
/// in-product approve/deny action.
fn decider_identity(
    state: &AppState,
    headers: &HeaderMap,
    id: ApprovalId,
    sig: &SigQuery,
) -> Result<String, GatewayError> {
    if let Ok(session) = authenticate(state, headers) {
        return Ok(session.tenant_id.to_string());
    }

    let (Some(signature), Some(expires_at)) = (sig.sig.as_deref(), sig.expires_at.as_deref())
    else {
        return Err(GatewayError::Auth("missing session or approval link signature".to_string()));
    };

    let record = state.approvals.status(id).ok_or(GatewayError::NotFound)?;
    let verified = verify_approval_sig(
        &state.approval_keys,
        &record.tenant_id,
        id,
        expires_at,
        sig.kid.as_deref(),
        signature,
    );
    if !verified {
        return Err(GatewayError::Auth("invalid or expired approval link signature".to_string()));
    }
    // §9 Open Question: the decider's own identity is not bound into the
    // signed link, only the right to decide the named approval -- see
    // `DESIGN.md`.
    Ok("link".to_string())
}

/// `POST /approvals/{id}/approve` (§6).
#[instrument(skip(state, headers, sig))]
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<ApprovalId>,
    Query(sig): Query<SigQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let decided_by = decider_identity(&state, &headers, id, &sig)?;
    state.approvals.decide(id, ApprovalStatus::Approved, Some(decided_by))?;
    Ok((
        StatusCode::OK,
        Json(ApprovalDecisionResponse {
            id,
            status: ApprovalStatus::Approved,
        }),
    ))
}

/// `POST /approvals/{id}/deny` (§6).
#[instrument(skip(state, headers, sig))]
pub async fn deny(
    State(state): State<AppState>,
    Path(id): Path<ApprovalId>,
    Query(sig): Query<SigQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let decided_by = decider_identity(&state, &headers, id, &sig)?;
    state.approvals.decide(id, ApprovalStatus::Denied, Some(decided_by))?;
    Ok((
        StatusCode::OK,
        Json(ApprovalDecisionResponse {
            id,
            status: ApprovalStatus::Denied,
        }),
    ))
}

/// `GET /approvals/{id}/status` (§6). Never exposes `details` -- only the
/// decision lifecycle fields, matching `ApprovalStatusResponse`'s refusal
/// to round-trip the original payload back to a polling caller.
#[instrument(skip(state, headers))]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<ApprovalId>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    authenticate(&state, &headers)?;
    let record = state.approvals.status(id).ok_or(GatewayError::NotFound)?;

    Ok((
        StatusCode::OK,
        Json(ApprovalStatusResponse {
            id: record.id,
            status: record.status,
            created_at: record.created_at.to_rfc3339(),
            expires_at: record.expires_at.to_rfc3339(),
            decided_at: record.decided_at.map(|t| t.to_rfc3339()),
            decided_by: record.decided_by,
        }),
    ))
}
