use serde::{Deserialize, Serialize};

use crate::ids::TenantId;

/// `(tenant_id, digest_of_shared_secret)`. Immutable at process start;
/// reloaded only by admin action (config file hot-reload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub tenant_id: TenantId,
    pub secret_digest_hex: String,
}
