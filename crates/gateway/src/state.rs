//! The gateway's shared application state: one instance of each admission
//! component, handed to every axum handler via `State<AppState>`.
//!
//! Grounded on `acteon-server::api::AppState`'s "one `Arc` per component,
//! `Clone` the struct rather than individual fields" shape.

use std::sync::Arc;

use breakwater_approval::ApprovalOrchestrator;
use breakwater_broker::CredentialBroker;
use breakwater_policy::PolicyTable;
use breakwater_proxy::ForwardProxy;
use breakwater_session::SessionManager;

use crate::approval_keys::ApprovalKeySet;
use crate::config::GatewayConfig;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub broker: Arc<CredentialBroker>,
    pub policies: Arc<PolicyTable>,
    pub approvals: Arc<ApprovalOrchestrator>,
    pub proxy: Arc<ForwardProxy>,
    pub approval_keys: ApprovalKeySet,
    pub config: Arc<GatewayConfig>,
}
