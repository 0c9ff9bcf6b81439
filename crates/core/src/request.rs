use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::ActionType;
use crate::ids::{ApprovalId, Provider, RequestId, TenantId};

/// Ephemeral record of one admission through the gateway pipeline. Lives
/// only for the duration of the request; logged on completion, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequestRecord {
    pub id: RequestId,
    pub tenant_id: TenantId,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub provider: Provider,
    pub classification: ActionType,
    pub requires_approval: bool,
    pub cred_selector: Option<String>,
    pub approval_id: Option<ApprovalId>,
}

impl GatewayRequestRecord {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        method: impl Into<String>,
        path: impl Into<String>,
        provider: Provider,
        classification: ActionType,
        requires_approval: bool,
        cred_selector: Option<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            tenant_id,
            timestamp: Utc::now(),
            method: method.into(),
            path: path.into(),
            provider,
            classification,
            requires_approval,
            cred_selector,
            approval_id: None,
        }
    }
}
