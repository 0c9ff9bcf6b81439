use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ApprovalId, RequestId, TenantId};

/// Default approval TTL: 1 hour (§5).
pub const DEFAULT_APPROVAL_TTL_SECONDS: i64 = 3600;

/// State of an [`ApprovalRecord`]. `Approved`, `Denied`, and `Expired` are
/// terminal; transitions toward them are monotonic and idempotent — a
/// second decision after a terminal state is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl ApprovalStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        })
    }
}

/// A request for human consent on one WRITE action, plus its eventual
/// decision. The decision rendezvous that unblocks waiters lives
/// alongside this record in `breakwater-approval`, not here — this type
/// is the plain data snapshot handed back over the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: ApprovalId,
    pub tenant_id: TenantId,
    pub source_request_id: RequestId,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub details: serde_json::Value,
}

impl ApprovalRecord {
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        source_request_id: RequestId,
        details: serde_json::Value,
        ttl_seconds: i64,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: ApprovalId::new(),
            tenant_id,
            source_request_id,
            status: ApprovalStatus::Pending,
            created_at,
            expires_at: created_at + chrono::Duration::seconds(ttl_seconds),
            decided_at: None,
            decided_by: None,
            details,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ApprovalStatus::Pending && now >= self.expires_at
    }

    /// Apply a terminal transition. Returns `false` without mutating if
    /// the record is already terminal (idempotent-on-terminal, §4.4).
    pub fn transition(&mut self, status: ApprovalStatus, decided_by: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.decided_at = Some(Utc::now());
        self.decided_by = decided_by;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ApprovalRecord {
        ApprovalRecord::new(
            TenantId::from("default"),
            RequestId::new(),
            serde_json::json!({}),
            DEFAULT_APPROVAL_TTL_SECONDS,
        )
    }

    #[test]
    fn transition_from_pending_succeeds_once() {
        let mut record = sample();
        assert!(record.transition(ApprovalStatus::Approved, Some("alice".to_string())));
        assert_eq!(record.status, ApprovalStatus::Approved);
        assert!(record.decided_at.is_some());
    }

    #[test]
    fn transition_after_terminal_is_a_noop() {
        let mut record = sample();
        assert!(record.transition(ApprovalStatus::Denied, None));
        let decided_at = record.decided_at;
        assert!(!record.transition(ApprovalStatus::Approved, Some("bob".to_string())));
        assert_eq!(record.status, ApprovalStatus::Denied);
        assert_eq!(record.decided_at, decided_at);
    }
}
