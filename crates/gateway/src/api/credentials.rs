use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::instrument;

use crate::api::auth::authenticate;
use crate::error::GatewayError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CredentialsResponse {
    pub fields: std::collections::HashMap<String, String>,
}

/// `GET /credentials/{selector}` -- the wrapper contract's credential fetch
/// (§4.7 step 3). Not tabulated in the external interfaces table alongside
/// `/api/v1/proxy`; see `DESIGN.md` for this Open Question's resolution.
/// Unlike the proxy path, here the resolved values are actually handed
/// back to the caller (the wrapper), which is the entire point -- they end
/// up as env vars in the exec'd child process, never logged or echoed.
#[instrument(skip(state, headers), fields(%selector))]
pub async fn get_credentials(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let session = authenticate(&state, &headers)?;
    let bundle = state.broker.get(&session.tenant_id, &selector).await?;
    let fields = bundle
        .field_names()
        .into_iter()
        .map(|name| (name.to_string(), bundle.get(name).unwrap_or_default().to_string()))
        .collect();
    Ok((StatusCode::OK, Json(CredentialsResponse { fields })))
}
