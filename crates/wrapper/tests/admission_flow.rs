//! End-to-end exercise of the wrapper contract's admission half (§4.7
//! steps 1-3) against a real gateway listening on a loopback socket --
//! the argv-surface counterpart to `breakwater-gateway`'s own
//! `tests/api_tests.rs`, which exercises the HTTP-surface admission
//! pipeline the same way.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use breakwater_approval::ApprovalOrchestrator;
use breakwater_broker::CredentialBroker;
use breakwater_core::{ActionType, CredentialBundle, EnrollmentRecord, PolicyMode, PolicyRecord, TenantId};
use breakwater_crypto::sha256_hex;
use breakwater_gateway::api;
use breakwater_gateway::approval_keys::ApprovalKeySet;
use breakwater_gateway::config::{
    ApprovalSection, GatewayConfig, PolicySection, ProxySection, ServerSection, SessionSection,
};
use breakwater_gateway::state::AppState;
use breakwater_policy::PolicyTable;
use breakwater_proxy::{ForwardProxy, ProviderTable};
use breakwater_session::{EnrollmentTable, SessionManager};

use breakwater_client::GatewayClient;
use breakwater_wrapper::{admit, Invocation};

const ENROLLMENT_SECRET: &str = "wrapper-test-secret";

async fn spawn_gateway(
    default_mode: PolicyMode,
    static_credentials: HashMap<String, CredentialBundle>,
) -> String {
    let enrollments = EnrollmentTable::new(vec![EnrollmentRecord {
        tenant_id: TenantId::from("acme"),
        secret_digest_hex: sha256_hex(ENROLLMENT_SECRET),
    }]);
    let sessions = Arc::new(SessionManager::new(enrollments, 3600));
    let broker = Arc::new(CredentialBroker::new(static_credentials));
    let policies = Arc::new(PolicyTable::new(
        HashMap::new(),
        PolicyRecord {
            mode: default_mode,
            exceptions: Vec::new(),
        },
    ));
    let approvals = Arc::new(ApprovalOrchestrator::new(3600));
    let providers = ProviderTable::new(HashMap::new(), "http://127.0.0.1:1".to_string());
    let proxy = Arc::new(
        ForwardProxy::with_timeout(providers, Duration::from_secs(5)).expect("client builds"),
    );
    let approval_keys = ApprovalKeySet::from_single(vec![0xCD; 32]);
    let config = Arc::new(GatewayConfig {
        server: ServerSection::default(),
        session: SessionSection::default(),
        approval: ApprovalSection {
            ttl_seconds: 3600,
            wait_timeout_seconds: 30,
            keys: Vec::new(),
        },
        proxy: ProxySection::default(),
        policy: PolicySection {
            policies_file: None,
            default_mode_strict: matches!(default_mode, PolicyMode::Strict),
            watch: false,
        },
    });

    let state = AppState {
        sessions,
        broker,
        policies,
        approvals,
        proxy,
        approval_keys,
        config,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind gateway listener");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

async fn enrolled_client(base_url: &str) -> (GatewayClient, String) {
    let client = GatewayClient::new(base_url).unwrap();
    let session = client.enroll("acme", ENROLLMENT_SECRET).await.unwrap();
    let token = session.session_token.clone();
    (client.with_session_token(session.session_token), token)
}

#[tokio::test]
async fn read_classification_skips_approval_entirely() {
    let base_url = spawn_gateway(PolicyMode::Strict, HashMap::new()).await;
    let (client, _token) = enrolled_client(&base_url).await;

    let invocation = Invocation {
        tenant_id: "acme".to_string(),
        provider: "kubectl".to_string(),
        command_line: "get pods".to_string(),
    };
    assert_eq!(invocation.classification(), ActionType::Read);

    // Strict mode gates every write, but this is a READ -- if `admit`
    // mistakenly gated it, the 5s wait would make this test hang and fail.
    let outcome = admit(&client, &invocation, None, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(outcome.approval_id.is_none());
    assert!(outcome.bundle.is_none());
}

#[tokio::test]
async fn read_with_selector_resolves_credentials_without_gating() {
    let mut creds = HashMap::new();
    creds.insert(
        "acme:datadog:ops".to_string(),
        CredentialBundle::single("api_key", "dd-key-abc".to_string()),
    );
    let base_url = spawn_gateway(PolicyMode::Strict, creds).await;
    let (client, _token) = enrolled_client(&base_url).await;

    let invocation = Invocation {
        tenant_id: "acme".to_string(),
        provider: "datadog".to_string(),
        command_line: "list".to_string(),
    };
    assert_eq!(invocation.classification(), ActionType::Read);

    let outcome = admit(&client, &invocation, Some("datadog:ops"), Duration::from_secs(5))
        .await
        .unwrap();
    assert!(outcome.approval_id.is_none());
    assert_eq!(outcome.bundle.unwrap().get("api_key"), Some("dd-key-abc"));
}

/// Exercises the same request -> concurrent-human-decision -> poll
/// sequence `admit` performs for a WRITE (§4.7 steps 1-2), driven
/// directly through `breakwater-client` so the test can hold the
/// approval id `admit` would otherwise keep internal to itself, and
/// assert the gateway's decision actually unblocks a waiter registered
/// before the decision lands (§4.4's "no lost wakeup" invariant, §8's
/// concurrent-waiter testable property).
#[tokio::test]
async fn write_approval_round_trip_then_credential_fetch() {
    let mut creds = HashMap::new();
    creds.insert(
        "acme:github:personal".to_string(),
        CredentialBundle::single("token", "ghs_wrapper_test".to_string()),
    );
    let base_url = spawn_gateway(PolicyMode::Strict, creds).await;
    let (client, token) = enrolled_client(&base_url).await;

    assert_eq!(
        breakwater_policy::classify_cli("gh", "create --title x"),
        ActionType::Write
    );

    let approval_id = client
        .request_approval("acme", "gh", "create --title x", ActionType::Write)
        .await
        .unwrap();

    let waiter = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .poll_until_terminal(approval_id, Duration::from_secs(10))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let decision = reqwest::Client::new()
        .post(format!("{base_url}/approvals/{approval_id}/approve"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(decision.status().is_success());

    let snapshot = waiter.await.unwrap().unwrap();
    assert_eq!(snapshot.status, "approved");

    let bundle = client.get_credentials("github:personal").await.unwrap();
    assert_eq!(bundle.get("token"), Some("ghs_wrapper_test"));
}

#[tokio::test]
async fn write_denial_round_trip_is_not_approved() {
    let base_url = spawn_gateway(PolicyMode::Strict, HashMap::new()).await;
    let (client, token) = enrolled_client(&base_url).await;

    assert_eq!(breakwater_policy::classify_cli("terraform", "apply"), ActionType::Write);

    let approval_id = client
        .request_approval("acme", "terraform", "apply", ActionType::Write)
        .await
        .unwrap();

    let waiter = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .poll_until_terminal(approval_id, Duration::from_secs(10))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let decision = reqwest::Client::new()
        .post(format!("{base_url}/approvals/{approval_id}/deny"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(decision.status().is_success());

    let snapshot = waiter.await.unwrap().unwrap();
    assert_eq!(snapshot.status, "denied");
}

#[tokio::test]
async fn multiple_concurrent_waiters_observe_the_same_denial() {
    let base_url = spawn_gateway(PolicyMode::Strict, HashMap::new()).await;
    let (client, token) = enrolled_client(&base_url).await;

    let approval_id = client
        .request_approval("acme", "aws", "put-object", ActionType::Write)
        .await
        .unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .poll_until_terminal(approval_id, Duration::from_secs(10))
                    .await
                    .unwrap()
                    .status
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    reqwest::Client::new()
        .post(format!("{base_url}/approvals/{approval_id}/deny"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), "denied");
    }
}
