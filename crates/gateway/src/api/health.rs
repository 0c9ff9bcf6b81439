use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// `GET /health` (§6). Always public, never gated by a session.
pub async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(body))
}
