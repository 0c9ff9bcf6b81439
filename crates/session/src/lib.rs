//! Session Manager (component A): tenant enrollment verification and
//! session token issuance/validation/revocation.
//!
//! Grounded on `acteon-server::auth::AuthProvider` — a hot-reloadable
//! lookup table behind a lock plus an in-process token store — but
//! simplified to match the spec's opaque-token model rather than JWTs:
//! there is nothing to decode, only a random token to look up.

use std::sync::RwLock;

use breakwater_core::{EnrollmentRecord, Session, TenantId};
use breakwater_crypto::{generate_token, verify_digest};
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown tenant")]
    UnknownTenant,
    #[error("enrollment secret does not match")]
    BadSecret,
}

/// Tenant enrollment table, swapped wholesale on config reload — never
/// mutated field-by-field, matching `AuthProvider::reload`'s atomic swap.
#[derive(Debug, Default, Clone)]
pub struct EnrollmentTable {
    records: std::collections::HashMap<TenantId, EnrollmentRecord>,
}

impl EnrollmentTable {
    #[must_use]
    pub fn new(records: Vec<EnrollmentRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.tenant_id.clone(), r)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, tenant_id: &TenantId) -> Option<&EnrollmentRecord> {
        self.records.get(tenant_id)
    }
}

pub struct SessionManager {
    enrollments: RwLock<EnrollmentTable>,
    sessions: DashMap<String, Session>,
    default_ttl_seconds: i64,
}

impl SessionManager {
    #[must_use]
    pub fn new(enrollments: EnrollmentTable, default_ttl_seconds: i64) -> Self {
        Self {
            enrollments: RwLock::new(enrollments),
            sessions: DashMap::new(),
            default_ttl_seconds,
        }
    }

    /// Atomically replace the enrollment table, e.g. after the
    /// enrollments config file changes on disk.
    pub fn reload_enrollments(&self, enrollments: EnrollmentTable) {
        let mut guard = self.enrollments.write().expect("enrollment lock poisoned");
        *guard = enrollments;
    }

    /// Constant-time digest comparison against the stored enrollment
    /// digest. Returns `false` for an unknown tenant — the distinction
    /// between "unknown tenant" and "wrong secret" is not observable by
    /// a caller either way, but is preserved in the `Err` variant for
    /// internal logging.
    #[must_use]
    pub fn verify_enrollment(&self, tenant_id: &TenantId, secret: &str) -> bool {
        self.verify_enrollment_detailed(tenant_id, secret).is_ok()
    }

    pub fn verify_enrollment_detailed(
        &self,
        tenant_id: &TenantId,
        secret: &str,
    ) -> Result<(), SessionError> {
        let table = self.enrollments.read().expect("enrollment lock poisoned");
        let record = table.get(tenant_id).ok_or(SessionError::UnknownTenant)?;
        if verify_digest(secret, &record.secret_digest_hex) {
            Ok(())
        } else {
            Err(SessionError::BadSecret)
        }
    }

    /// Issue a new session for `tenant_id`, returning the bearer token.
    #[must_use]
    pub fn create_session(&self, tenant_id: TenantId) -> (String, Session) {
        let token = generate_token();
        let session = Session::new(tenant_id, self.default_ttl_seconds);
        self.sessions.insert(token.clone(), session.clone());
        (token, session)
    }

    /// Validate a bearer token. An expired session is evicted on access
    /// and reported identically to an unknown token — no observable
    /// difference between "never existed" and "expired" (§4.1 invariant).
    #[must_use]
    pub fn validate_token(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        let entry = self.sessions.get(token)?;
        if entry.is_expired(now) {
            drop(entry);
            self.sessions.remove(token);
            return None;
        }
        Some(entry.clone())
    }

    /// Revoke a session. Returns `true` if a session was removed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Evict all expired sessions. Intended to run on a periodic sweep
    /// alongside the approval orchestrator's own sweeper.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        let count = expired.len();
        for token in expired {
            self.sessions.remove(&token);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakwater_crypto::sha256_hex;

    fn manager() -> SessionManager {
        let enrollments = EnrollmentTable::new(vec![EnrollmentRecord {
            tenant_id: TenantId::from("default"),
            secret_digest_hex: sha256_hex("test-secret-123"),
        }]);
        SessionManager::new(enrollments, 3600)
    }

    #[test]
    fn verify_enrollment_accepts_correct_secret_and_rejects_mutation() {
        let mgr = manager();
        let tenant = TenantId::from("default");
        assert!(mgr.verify_enrollment(&tenant, "test-secret-123"));
        assert!(!mgr.verify_enrollment(&tenant, "test-secret-124"));
    }

    #[test]
    fn verify_enrollment_rejects_unknown_tenant() {
        let mgr = manager();
        assert!(!mgr.verify_enrollment(&TenantId::from("ghost"), "anything"));
    }

    #[test]
    fn create_then_validate_round_trips_tenant() {
        let mgr = manager();
        let tenant = TenantId::from("default");
        let (token, _session) = mgr.create_session(tenant.clone());
        let validated = mgr.validate_token(&token).expect("session should be valid");
        assert_eq!(validated.tenant_id, tenant);
    }

    #[test]
    fn revoke_makes_token_indistinguishable_from_unknown() {
        let mgr = manager();
        let (token, _) = mgr.create_session(TenantId::from("default"));
        assert!(mgr.revoke(&token));
        assert!(mgr.validate_token(&token).is_none());
        assert!(!mgr.revoke(&token));
    }

    #[test]
    fn expired_session_is_evicted_on_access() {
        let mgr = SessionManager::new(EnrollmentTable::default(), -1);
        let (token, _) = mgr.create_session(TenantId::from("default"));
        assert!(mgr.validate_token(&token).is_none());
        assert_eq!(mgr.sweep_expired(), 0, "already evicted by validate_token");
    }
}
