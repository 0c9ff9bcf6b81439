use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Response};
use tracing::instrument;

use breakwater_core::{ActionType, GatewayRequestRecord, Provider};
use breakwater_policy::requires_approval;

use crate::api::auth::authenticate;
use crate::error::GatewayError;
use crate::state::AppState;

/// `ANY /api/v1/proxy/{*path}` (§6, §4.6): the gateway front-end's
/// admission pipeline -- authenticate, classify, gate on policy, resolve
/// credentials, forward.
#[instrument(skip(state, headers, body), fields(%method, %path))]
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response<Body>, GatewayError> {
    let session = authenticate(&state, &headers)?;

    let provider_header = headers
        .get("x-provider")
        .ok_or_else(|| GatewayError::BadRequest("missing X-Provider header".to_string()))?
        .to_str()
        .map_err(|_| GatewayError::BadRequest("X-Provider header is not valid UTF-8".to_string()))?;
    let provider = Provider::from(provider_header);

    let classification = ActionType::from_http_method(method.as_str());

    let mut record = GatewayRequestRecord::new(
        session.tenant_id.clone(),
        method.as_str(),
        path.clone(),
        provider.clone(),
        classification,
        false,
        headers.get("x-creds").and_then(|v| v.to_str().ok()).map(str::to_string),
    );

    let needs_approval = requires_approval(
        &state.policies,
        &session.tenant_id,
        classification,
        provider.as_str(),
        method.as_str(),
        &path,
    );
    record.requires_approval = needs_approval;

    if needs_approval {
        let details = serde_json::json!({
            "method": method.as_str(),
            "path": path,
            "provider": provider.as_str(),
        });
        let approval_id = state
            .approvals
            .request(session.tenant_id.clone(), record.id, details);
        record.approval_id = Some(approval_id);

        let wait_timeout = std::time::Duration::from_secs(state.config.approval.wait_timeout_seconds);
        let approved = state.approvals.wait(approval_id, wait_timeout).await?;
        if !approved {
            return Err(GatewayError::PolicyDenied);
        }
    }

    let credentials = match headers.get("x-creds") {
        Some(value) => {
            let selector = value
                .to_str()
                .map_err(|_| GatewayError::BadRequest("X-Creds header is not valid UTF-8".to_string()))?;
            Some(state.broker.get(&session.tenant_id, selector).await?)
        }
        None => None,
    };

    let (status, response_body, response_headers) = state
        .proxy
        .forward(
            method.as_str(),
            &path,
            &headers,
            body.to_vec(),
            credentials.as_ref(),
            provider.as_str(),
        )
        .await?;

    tracing::info!(
        request_id = %record.id,
        tenant_id = %record.tenant_id,
        classification = %record.classification,
        requires_approval = record.requires_approval,
        approval_id = ?record.approval_id,
        response_status = status,
        "admission completed"
    );

    let mut response = Response::builder()
        .status(status)
        .body(Body::from(response_body))
        .expect("status and body are always valid");
    *response.headers_mut() = response_headers;
    Ok(response)
}
