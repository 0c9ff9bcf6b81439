//! Internal HTTP client for the gateway's own admission and approval
//! endpoints (§6), used by `breakwater-wrapper` to drive the wrapper
//! contract (§4.7) over the network rather than linking the gateway's
//! components in-process.
//!
//! Grounded on `acteon-client::ActeonClient`'s builder-plus-bearer-header
//! shape, trimmed to the handful of calls the wrapper actually needs:
//! requesting an approval, polling its status, and fetching a credential
//! bundle.

use std::collections::HashMap;
use std::time::Duration;

use breakwater_core::{ActionType, ApprovalId, CredentialBundle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// How often the wrapper polls `GET /approvals/{id}/status` while waiting on
/// a human decision.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach gateway: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("gateway returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected response shape: {0}")]
    Deserialization(String),

    #[error("approval was not decided before the poll deadline")]
    PollTimeout,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    tenant_id: &'a str,
    enrollment_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub session_token: String,
    pub ttl_seconds: i64,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
struct ApprovalRequest<'a> {
    tenant_id: &'a str,
    command: &'a str,
    args: &'a str,
    classification: ActionType,
}

#[derive(Debug, Deserialize)]
struct ApprovalCreatedResponse {
    id: ApprovalId,
}

/// Mirrors `ApprovalRecord`'s public shape (§3) minus `details`, which is
/// never round-tripped back to a polling caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalSnapshot {
    pub id: ApprovalId,
    pub status: String,
    pub created_at: String,
    pub expires_at: String,
    pub decided_at: Option<String>,
    pub decided_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialsResponse {
    fields: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// A client bound to one gateway and, once authenticated, one session.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl GatewayClient {
    /// Build an unauthenticated client for `base_url`, trimmed of any
    /// trailing slash.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: None,
        })
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| "gateway returned no error body".to_string());
        Err(ClientError::Http { status, message })
    }

    /// `POST /session/new` (§6). Not bearer-authenticated -- this is how a
    /// session token is obtained in the first place.
    #[instrument(skip(enrollment_secret), fields(%tenant_id))]
    pub async fn enroll(
        &self,
        tenant_id: &str,
        enrollment_secret: &str,
    ) -> Result<SessionResponse, ClientError> {
        let url = format!("{}/session/new", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&SessionRequest {
                tenant_id,
                enrollment_secret,
            })
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        response
            .json::<SessionResponse>()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))
    }

    /// Create an approval request for a WRITE tool invocation (§4.7 step 2).
    #[instrument(skip(self), fields(%tenant_id, %command))]
    pub async fn request_approval(
        &self,
        tenant_id: &str,
        command: &str,
        args: &str,
        classification: ActionType,
    ) -> Result<ApprovalId, ClientError> {
        let url = format!("{}/approvals", self.base_url);
        let response = self
            .authed(self.http.post(&url))
            .json(&ApprovalRequest {
                tenant_id,
                command,
                args,
                classification,
            })
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        let created = response
            .json::<ApprovalCreatedResponse>()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))?;
        Ok(created.id)
    }

    /// `GET /approvals/{id}/status` (§6).
    #[instrument(skip(self))]
    pub async fn approval_status(&self, id: ApprovalId) -> Result<ApprovalSnapshot, ClientError> {
        let url = format!("{}/approvals/{id}/status", self.base_url);
        let response = self.authed(self.http.get(&url)).send().await?;
        let response = Self::error_for_status(response).await?;
        response
            .json::<ApprovalSnapshot>()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))
    }

    /// Poll `approval_status` until it reaches a terminal state or
    /// `timeout` elapses (§4.7 step 2's "poll status endpoint until
    /// terminal").
    #[instrument(skip(self))]
    pub async fn poll_until_terminal(
        &self,
        id: ApprovalId,
        timeout: Duration,
    ) -> Result<ApprovalSnapshot, ClientError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let snapshot = self.approval_status(id).await?;
            if snapshot.status != "pending" {
                return Ok(snapshot);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ClientError::PollTimeout);
            }
            tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        }
    }

    /// `GET /credentials/{selector}` -- the credential endpoint the wrapper
    /// contract (§4.7 step 3) fetches from, not explicitly tabulated in §6's
    /// HTTP surface but implied by "fetch credentials via gateway credential
    /// endpoint"; see `DESIGN.md` for this Open Question's resolution.
    #[instrument(skip(self), fields(%selector))]
    pub async fn get_credentials(&self, selector: &str) -> Result<CredentialBundle, ClientError> {
        let url = format!("{}/credentials/{selector}", self.base_url);
        let response = self.authed(self.http.get(&url)).send().await?;
        let response = Self::error_for_status(response).await?;
        let body = response
            .json::<CredentialsResponse>()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))?;
        Ok(CredentialBundle::new(body.fields))
    }
}
