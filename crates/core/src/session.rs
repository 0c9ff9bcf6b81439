use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TenantId;

/// Default session TTL: 1 hour (§5).
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 3600;

/// An authenticated agent session. Carries no secret material itself — the
/// token is the secret, and is generated by `breakwater-crypto::generate_token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(tenant_id: TenantId, ttl_seconds: i64) -> Self {
        let created_at = Utc::now();
        Self {
            tenant_id,
            created_at,
            expires_at: created_at + chrono::Duration::seconds(ttl_seconds),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
