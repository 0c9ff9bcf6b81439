//! Approval Orchestrator (component D): the approval state machine plus
//! the decision rendezvous that unblocks any number of current and
//! future waiters exactly once.
//!
//! The rendezvous is a `tokio::sync::broadcast` channel per approval,
//! grounded on `acteon-server::api::stream`'s use of `broadcast` for
//! fan-out event delivery (a `oneshot` only appears in the corpus for
//! single-consumer shutdown signaling, which doesn't fit "any number of
//! waiters"). The lost-wakeup hazard this spec calls out explicitly is
//! avoided by always subscribing to the broadcast channel *before*
//! reading the record's current status: if a decision lands between
//! those two steps, the status read already observes it; if it lands
//! after, the subscription already queued to receive it. Checking status
//! first and subscribing second would leave a window where a decision
//! between the two is neither observed nor delivered.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use breakwater_core::{ApprovalId, ApprovalRecord, ApprovalStatus, RequestId, TenantId};
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("unknown approval id")]
    NotFound,
    #[error("approval is already in a terminal state")]
    AlreadyDecided,
}

/// Broadcast channel capacity. Deciding an approval sends exactly one
/// message; this only needs to be large enough that a burst of decisions
/// across many approvals doesn't lag a slow-polling subscriber on an
/// unrelated id, since each approval has its own channel.
const RENDEZVOUS_CAPACITY: usize = 4;

struct ApprovalEntry {
    record: RwLock<ApprovalRecord>,
    tx: broadcast::Sender<ApprovalStatus>,
}

pub struct ApprovalOrchestrator {
    entries: DashMap<ApprovalId, Arc<ApprovalEntry>>,
    default_ttl_seconds: i64,
}

impl ApprovalOrchestrator {
    #[must_use]
    pub fn new(default_ttl_seconds: i64) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl_seconds,
        }
    }

    /// Create a new PENDING approval record. Notification dispatch to the
    /// out-of-scope transport (chat DM, desktop popup, TTY prompt) is the
    /// caller's responsibility and must be best-effort: a notification
    /// failure must never prevent the record from being created or
    /// block the admission pipeline.
    #[instrument(skip(self, details), fields(%tenant_id, %source_request_id))]
    pub fn request(
        &self,
        tenant_id: TenantId,
        source_request_id: RequestId,
        details: serde_json::Value,
    ) -> ApprovalId {
        let record = ApprovalRecord::new(tenant_id, source_request_id, details, self.default_ttl_seconds);
        let id = record.id;
        let (tx, _rx) = broadcast::channel(RENDEZVOUS_CAPACITY);
        self.entries.insert(
            id,
            Arc::new(ApprovalEntry {
                record: RwLock::new(record),
                tx,
            }),
        );
        id
    }

    /// Apply a human decision. Idempotent on an already-terminal record:
    /// returns `AlreadyDecided` without mutating or re-broadcasting.
    #[instrument(skip(self, decided_by), fields(%id, ?status))]
    pub fn decide(
        &self,
        id: ApprovalId,
        status: ApprovalStatus,
        decided_by: Option<String>,
    ) -> Result<(), ApprovalError> {
        assert!(status != ApprovalStatus::Pending, "decide must be terminal");
        let entry = self.entries.get(&id).ok_or(ApprovalError::NotFound)?.clone();
        let transitioned = {
            let mut record = entry.record.write().expect("approval lock poisoned");
            record.transition(status, decided_by)
        };
        if !transitioned {
            return Err(ApprovalError::AlreadyDecided);
        }
        let _ = entry.tx.send(status);
        Ok(())
    }

    /// Block until the approval leaves PENDING or `timeout` elapses.
    /// Returns `true` iff the final state is APPROVED. On caller timeout
    /// the record itself is transitioned to EXPIRED so subsequent callers
    /// see a consistent terminal state rather than a still-PENDING one
    /// whose TTL merely hasn't been swept yet.
    #[instrument(skip(self), fields(%id, timeout_secs = timeout.as_secs()))]
    pub async fn wait(&self, id: ApprovalId, timeout: Duration) -> Result<bool, ApprovalError> {
        let entry = self.entries.get(&id).ok_or(ApprovalError::NotFound)?.clone();
        let mut rx = entry.tx.subscribe();

        if let Some(status) = Self::terminal_status(&entry) {
            return Ok(status == ApprovalStatus::Approved);
        }

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Ok(status)) => Ok(status == ApprovalStatus::Approved),
            Ok(Err(_lagged_or_closed)) => {
                Ok(Self::terminal_status(&entry) == Some(ApprovalStatus::Approved))
            }
            Err(_elapsed) => {
                let mut record = entry.record.write().expect("approval lock poisoned");
                if record.transition(ApprovalStatus::Expired, None) {
                    let _ = entry.tx.send(ApprovalStatus::Expired);
                }
                Ok(false)
            }
        }
    }

    fn terminal_status(entry: &ApprovalEntry) -> Option<ApprovalStatus> {
        let record = entry.record.read().expect("approval lock poisoned");
        record.status.is_terminal().then_some(record.status)
    }

    #[must_use]
    pub fn status(&self, id: ApprovalId) -> Option<ApprovalRecord> {
        let entry = self.entries.get(&id)?;
        Some(entry.record.read().expect("approval lock poisoned").clone())
    }

    /// Transition every still-PENDING record whose TTL has elapsed to
    /// EXPIRED, signalling their rendezvouses. Intended to run on a
    /// periodic background tick alongside the session sweeper.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut count = 0;
        for entry_ref in self.entries.iter() {
            let entry = entry_ref.value();
            let expired = {
                let record = entry.record.read().expect("approval lock poisoned");
                record.is_expired(now)
            };
            if expired {
                let mut record = entry.record.write().expect("approval lock poisoned");
                if record.transition(ApprovalStatus::Expired, None) {
                    drop(record);
                    let _ = entry.tx.send(ApprovalStatus::Expired);
                    count += 1;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::from("default")
    }

    #[tokio::test]
    async fn approve_unblocks_a_waiter_registered_before_the_decision() {
        let orchestrator = Arc::new(ApprovalOrchestrator::new(3600));
        let id = orchestrator.request(tenant(), RequestId::new(), serde_json::json!({}));

        let waiter = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.wait(id, Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        orchestrator
            .decide(id, ApprovalStatus::Approved, Some("alice".to_string()))
            .unwrap();

        assert!(waiter.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn wait_registered_after_decision_returns_immediately() {
        let orchestrator = ApprovalOrchestrator::new(3600);
        let id = orchestrator.request(tenant(), RequestId::new(), serde_json::json!({}));
        orchestrator.decide(id, ApprovalStatus::Denied, None).unwrap();

        let result = orchestrator.wait(id, Duration::from_millis(10)).await.unwrap();
        assert!(!result);
    }

    #[tokio::test]
    async fn many_concurrent_waiters_observe_the_same_denial() {
        let orchestrator = Arc::new(ApprovalOrchestrator::new(3600));
        let id = orchestrator.request(tenant(), RequestId::new(), serde_json::json!({}));

        let mut waiters = Vec::new();
        for _ in 0..8 {
            let orchestrator = orchestrator.clone();
            waiters.push(tokio::spawn(async move {
                orchestrator.wait(id, Duration::from_secs(5)).await
            }));
        }
        tokio::task::yield_now().await;
        orchestrator.decide(id, ApprovalStatus::Denied, None).unwrap();

        for waiter in waiters {
            assert!(!waiter.await.unwrap().unwrap());
        }

        let err = orchestrator
            .decide(id, ApprovalStatus::Approved, Some("late".to_string()))
            .unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyDecided));
        assert_eq!(
            orchestrator.status(id).unwrap().status,
            ApprovalStatus::Denied
        );
    }

    #[tokio::test]
    async fn wait_times_out_to_expired_when_no_decision_arrives() {
        let orchestrator = ApprovalOrchestrator::new(3600);
        let id = orchestrator.request(tenant(), RequestId::new(), serde_json::json!({}));

        let result = orchestrator.wait(id, Duration::from_millis(20)).await.unwrap();
        assert!(!result);
        assert_eq!(
            orchestrator.status(id).unwrap().status,
            ApprovalStatus::Expired
        );
    }

    #[tokio::test]
    async fn sweep_expires_stale_pending_approvals_and_wakes_waiters() {
        let orchestrator = Arc::new(ApprovalOrchestrator::new(-1));
        let id = orchestrator.request(tenant(), RequestId::new(), serde_json::json!({}));

        let waiter = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.wait(id, Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(orchestrator.sweep_expired(), 1);
        assert!(!waiter.await.unwrap().unwrap());
    }
}
