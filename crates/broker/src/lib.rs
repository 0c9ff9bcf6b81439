//! Credential Broker (component B): resolves `(tenant, selector)` to a
//! [`CredentialBundle`], in the order the spec fixes: in-memory cache,
//! then the `CRED_<TENANT>_<SELECTOR>` environment variable, then any
//! configured external backend.
//!
//! Grounded on `acteon-server::auth::api_key`'s table-lookup shape for the
//! static/config-backed tier, generalized with a pluggable backend trait
//! for the out-of-scope secret-manager transports (1Password, Vault,
//! cloud secret managers) the spec names only as interface points.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use breakwater_core::{CredentialBundle, TenantId};
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("no credential bundle found for selector '{0}'")]
    NotFound(String),
}

/// A pluggable external credential source (1Password, Vault, a cloud
/// secret manager, ...). Out of scope to implement concretely here — the
/// spec specifies only this interface.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    async fn resolve(&self, tenant_id: &TenantId, selector: &str) -> Option<CredentialBundle>;
}

fn cache_key(tenant_id: &TenantId, selector: &str) -> String {
    format!("{tenant_id}:{selector}")
}

fn env_var_name(tenant_id: &TenantId, selector: &str) -> String {
    let sanitize = |s: &str| {
        s.to_ascii_uppercase()
            .replace(['-', ':'], "_")
    };
    format!("CRED_{}_{}", sanitize(tenant_id.as_str()), sanitize(selector))
}

pub struct CredentialBroker {
    cache: DashMap<String, CredentialBundle>,
    backends: Vec<Arc<dyn CredentialBackend>>,
}

impl CredentialBroker {
    #[must_use]
    pub fn new(static_bundles: HashMap<String, CredentialBundle>) -> Self {
        Self {
            cache: static_bundles.into_iter().collect(),
            backends: Vec::new(),
        }
    }

    /// Register an external backend, consulted after the cache and
    /// environment-variable tiers miss.
    pub fn with_backend(mut self, backend: Arc<dyn CredentialBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Seed or refresh the cache, e.g. on config reload. Existing entries
    /// for keys not present in `static_bundles` are left untouched —
    /// unlike the session/enrollment tables this is an additive merge,
    /// since the cache also accumulates backend-resolved entries at
    /// runtime.
    pub fn reload_static(&self, static_bundles: HashMap<String, CredentialBundle>) {
        for (key, bundle) in static_bundles {
            self.cache.insert(key, bundle);
        }
    }

    pub async fn get(
        &self,
        tenant_id: &TenantId,
        selector: &str,
    ) -> Result<CredentialBundle, BrokerError> {
        let key = cache_key(tenant_id, selector);
        if let Some(bundle) = self.cache.get(&key) {
            return Ok(bundle.clone());
        }

        if let Ok(value) = std::env::var(env_var_name(tenant_id, selector)) {
            return Ok(CredentialBundle::single("token", value));
        }

        for backend in &self.backends {
            if let Some(bundle) = backend.resolve(tenant_id, selector).await {
                self.cache.insert(key, bundle.clone());
                return Ok(bundle);
            }
        }

        Err(BrokerError::NotFound(selector.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::from("acme")
    }

    #[tokio::test]
    async fn resolves_from_static_cache() {
        let mut bundles = HashMap::new();
        bundles.insert(
            cache_key(&tenant(), "github:personal"),
            CredentialBundle::single("token", "ghs_abc".to_string()),
        );
        let broker = CredentialBroker::new(bundles);
        let bundle = broker.get(&tenant(), "github:personal").await.unwrap();
        assert_eq!(bundle.get("token"), Some("ghs_abc"));
    }

    #[tokio::test]
    async fn missing_selector_is_not_found() {
        let broker = CredentialBroker::new(HashMap::new());
        let err = broker.get(&tenant(), "ghost:none").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotFound(_)));
    }

    #[test]
    fn env_var_name_sanitizes_selector() {
        assert_eq!(
            env_var_name(&TenantId::from("acme-corp"), "github:personal"),
            "CRED_ACME_CORP_GITHUB_PERSONAL"
        );
    }
}
