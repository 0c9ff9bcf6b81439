pub mod approvals;
pub mod auth;
pub mod credentials;
pub mod health;
pub mod proxy;
pub mod session;

use axum::Router;
use axum::routing::{any, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the gateway's HTTP surface (§6): health, session issuance, the
/// forward proxy, approval decisions, and credential lookup.
///
/// Grounded on `acteon-server::api::router`'s `Router::new().route(...)`
/// composition, trimmed to the endpoints Breakwater actually exposes --
/// no Swagger UI or Admin UI fallback, since neither is part of the trust
/// gateway's surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/session/new", post(session::new_session))
        .route("/api/v1/proxy/{*path}", any(proxy::proxy))
        .route("/approvals", post(approvals::create))
        .route("/approvals/{id}/approve", post(approvals::approve))
        .route("/approvals/{id}/deny", post(approvals::deny))
        .route("/approvals/{id}/status", get(approvals::status))
        .route("/credentials/{selector}", get(credentials::get_credentials))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
