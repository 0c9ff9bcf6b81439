//! Wrapper Contract (component G): the per-tool client side of the
//! admission pipeline. Given one tool invocation's argv, it classifies
//! the action, gates writes on human approval, resolves credentials, and
//! execs the real tool with a scrubbed, credential-injected environment.
//!
//! Grounded on `acteon-cli`'s `DispatchArgs`/`run` shape (parse argv,
//! call out to a client, print/propagate the result) generalized from a
//! one-shot dispatch-and-print CLI into an exec wrapper, since §4.7's
//! contract ends in replacing the current process image rather than
//! printing a response.

pub mod env;

use std::time::Duration;

use breakwater_client::{ClientError, GatewayClient};
use breakwater_core::{ActionType, ApprovalId, CredentialBundle};
use breakwater_policy::classify_cli;

/// How long the wrapper waits for a pending approval before giving up
/// (§4.7 step 2's "poll status endpoint until terminal"). Bounded below
/// the approval's own 1h TTL so a wrapper invocation doesn't hang the
/// calling shell indefinitely; an operator fronting this with their own
/// timeout is expected to use a larger value.
pub const DEFAULT_APPROVAL_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, thiserror::Error)]
pub enum WrapperError {
    #[error("approval {0} was not granted before the wait elapsed: {1}")]
    Denied(ApprovalId, String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("GATEWAY_CREDS selector '{0}' did not resolve to a credential bundle: {1}")]
    CredentialsUnresolved(String, ClientError),
}

/// Result of running one invocation through §4.7 steps 1-3. `approval_id`
/// is `Some` only when the invocation classified as a WRITE and therefore
/// needed gating -- carried through so a caller can log it as a
/// correlation id (§7) even on the happy path, not just in error logs.
#[derive(Debug)]
pub struct AdmissionOutcome {
    pub approval_id: Option<ApprovalId>,
    pub bundle: Option<CredentialBundle>,
}

/// One wrapper invocation's inputs, gathered from argv and the
/// environment variables §6 lists the wrapper as consuming.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub tenant_id: String,
    pub provider: String,
    pub command_line: String,
}

impl Invocation {
    #[must_use]
    pub fn classification(&self) -> ActionType {
        classify_cli(&self.provider, &self.command_line)
    }
}

/// Steps 1-3 of §4.7: classify, gate on approval if the classification
/// demands it, and resolve a credential bundle if one is configured.
/// Resolves once it is safe to exec -- i.e. either the action never
/// needed approval or a human has already approved it.
///
/// Kept separate from the exec step itself (see `main.rs`) so this async,
/// network-touching admission logic stays unit-testable without spawning
/// real child processes.
pub async fn admit(
    client: &GatewayClient,
    invocation: &Invocation,
    creds_selector: Option<&str>,
    approval_wait: Duration,
) -> Result<AdmissionOutcome, WrapperError> {
    let classification = invocation.classification();
    let mut approval_id = None;

    if classification == ActionType::Write {
        let id = client
            .request_approval(
                &invocation.tenant_id,
                &invocation.provider,
                &invocation.command_line,
                classification,
            )
            .await?;
        approval_id = Some(id);

        let snapshot = match client.poll_until_terminal(id, approval_wait).await {
            Ok(snapshot) => snapshot,
            Err(ClientError::PollTimeout) => {
                return Err(WrapperError::Denied(id, "wait timed out".to_string()));
            }
            Err(e) => return Err(WrapperError::Client(e)),
        };
        if snapshot.status != "approved" {
            return Err(WrapperError::Denied(id, snapshot.status));
        }
    }

    let bundle = match creds_selector {
        Some(selector) => Some(
            client
                .get_credentials(selector)
                .await
                .map_err(|e| WrapperError::CredentialsUnresolved(selector.to_string(), e))?,
        ),
        None => None,
    };

    Ok(AdmissionOutcome { approval_id, bundle })
}
