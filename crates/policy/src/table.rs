use std::collections::HashMap;
use std::sync::RwLock;

use breakwater_core::{PolicyRecord, TenantId};

/// Tenant policy table, hot-reloadable from the policies config file.
/// Swapped wholesale on reload, matching the enrollment/session tables'
/// atomic-swap convention.
pub struct PolicyTable {
    records: RwLock<HashMap<TenantId, PolicyRecord>>,
    default_policy: PolicyRecord,
}

impl PolicyTable {
    #[must_use]
    pub fn new(records: HashMap<TenantId, PolicyRecord>, default_policy: PolicyRecord) -> Self {
        Self {
            records: RwLock::new(records),
            default_policy,
        }
    }

    pub fn reload(&self, records: HashMap<TenantId, PolicyRecord>) {
        let mut guard = self.records.write().expect("policy lock poisoned");
        *guard = records;
    }

    /// The tenant's policy, falling back to the configured default when
    /// the tenant has no explicit record (§4.3 step 2).
    pub fn for_tenant(&self, tenant_id: &TenantId) -> PolicyRecord {
        let guard = self.records.read().expect("policy lock poisoned");
        guard.get(tenant_id).cloned().unwrap_or_else(|| self.default_policy.clone())
    }
}
