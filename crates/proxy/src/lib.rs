//! HTTP Forward Proxy (component E): strips gateway-internal headers, overlays
//! provider-specific credential injection, forwards the request upstream, and
//! scrubs sensitive response headers before relaying the result.
//!
//! Grounded on `acteon-provider`'s per-provider dispatch shape (a pure
//! function from provider name to behavior) and `acteon-gateway`'s use of a
//! single shared `reqwest::Client` with a bounded timeout rather than building
//! a fresh client per call.

use std::collections::HashMap;
use std::time::Duration;

use breakwater_core::CredentialBundle;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use tracing::instrument;

/// Default forward-proxy upstream timeout (§5).
pub const DEFAULT_FORWARD_TIMEOUT_SECONDS: u64 = 30;

/// Gateway-internal request headers that must never reach the upstream
/// provider (§4.5 step 3).
const STRIPPED_REQUEST_HEADERS: &[&str] = &["authorization", "x-creds", "x-provider"];

/// Response headers that must never be relayed back to the caller (§4.5
/// step 6, §8 testable property).
const REDACTED_RESPONSE_HEADERS: &[&str] = &["authorization", "x-api-key", "cookie"];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("method '{0}' is not accepted on the proxy path")]
    MethodNotAllowed(String),

    /// §4.5's documented caveat: the forward path does not perform SigV4
    /// request signing, so AWS traffic is rejected here rather than sent
    /// unsigned. Preserved as a deliberate gap, not silently "fixed" -- a
    /// correct caller should use the wrapper's argv path for AWS instead.
    #[error("provider '{0}' is not supported on the HTTP forward path")]
    UnsupportedProvider(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("invalid header in forwarded request: {0}")]
    InvalidHeader(String),
}

/// Provider name that the forward path refuses rather than forward unsigned
/// (§4.5 point 4, aws caveat).
const UNSUPPORTED_HTTP_PROVIDERS: &[&str] = &["aws"];

/// Maps a provider name to its upstream base URL. Unknown providers fall
/// back to `default_base_url`, which must be operator-configured rather than
/// hard-coded to any live production endpoint (§4.5 point 1).
#[derive(Debug, Clone)]
pub struct ProviderTable {
    bases: HashMap<String, String>,
    default_base_url: String,
}

impl ProviderTable {
    #[must_use]
    pub fn new(bases: HashMap<String, String>, default_base_url: String) -> Self {
        Self {
            bases,
            default_base_url,
        }
    }

    /// The well-known defaults named in the spec's end-to-end scenarios,
    /// overridable per-provider by config.
    #[must_use]
    pub fn with_defaults(default_base_url: String) -> Self {
        let bases = [
            ("github", "https://api.github.com"),
            ("slack", "https://slack.com/api"),
            ("gcp", "https://www.googleapis.com"),
            ("gcloud", "https://www.googleapis.com"),
            ("datadog", "https://api.datadoghq.com"),
            ("linear", "https://api.linear.app"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self::new(bases, default_base_url)
    }

    /// The well-known defaults overlaid with operator-configured
    /// overrides, which may also name providers outside the defaults.
    #[must_use]
    pub fn with_defaults_and_overrides(
        default_base_url: String,
        overrides: HashMap<String, String>,
    ) -> Self {
        let mut table = Self::with_defaults(default_base_url);
        table.bases.extend(overrides);
        table
    }

    #[must_use]
    pub fn base_url(&self, provider: &str) -> &str {
        self.bases
            .get(provider)
            .map_or(self.default_base_url.as_str(), String::as_str)
    }
}

/// Headers to add for one provider's credential bundle (§4.5 point 4).
/// Returns `None` when the bundle carries none of the fields a given
/// provider's injection rule looks for.
fn injected_headers(provider: &str, bundle: &CredentialBundle) -> Vec<(&'static str, String)> {
    match provider {
        "github" => bundle
            .get("token")
            .map(|t| vec![("Authorization", format!("token {t}"))])
            .or_else(|| {
                bundle
                    .get("bearer_token")
                    .map(|t| vec![("Authorization", format!("Bearer {t}"))])
            })
            .unwrap_or_default(),
        "slack" | "gcp" | "gcloud" | "linear" => bundle
            .get("token")
            .or_else(|| bundle.get("bearer_token"))
            .or_else(|| bundle.get("api_key"))
            .map(|t| vec![("Authorization", format!("Bearer {t}"))])
            .unwrap_or_default(),
        "datadog" => {
            let mut headers = Vec::new();
            if let Some(key) = bundle.get("api_key") {
                headers.push(("DD-API-KEY", key.to_string()));
            }
            if let Some(app_key) = bundle.get("app_key") {
                headers.push(("DD-APPLICATION-KEY", app_key.to_string()));
            }
            headers
        }
        _ => Vec::new(),
    }
}

/// Build the outbound header set: copy inbound headers, strip the
/// gateway-internal ones, then overlay provider credential injection.
fn build_outbound_headers(
    inbound: &HeaderMap,
    provider: &str,
    credentials: Option<&CredentialBundle>,
) -> Result<HeaderMap, ProxyError> {
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        out.insert(name.clone(), value.clone());
    }

    if let Some(bundle) = credentials {
        for (name, value) in injected_headers(provider, bundle) {
            let header_name = HeaderName::from_static(name);
            let header_value = HeaderValue::from_str(&value)
                .map_err(|e| ProxyError::InvalidHeader(e.to_string()))?;
            out.insert(header_name, header_value);
        }
    }

    Ok(out)
}

/// Response headers with everything in [`REDACTED_RESPONSE_HEADERS`] removed
/// (§4.5 step 6, case-insensitive).
fn scrub_response_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !REDACTED_RESPONSE_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

const ACCEPTED_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS",
];

pub struct ForwardProxy {
    client: reqwest::Client,
    providers: ProviderTable,
}

impl ForwardProxy {
    /// Build a proxy with the default forward timeout (§5).
    pub fn new(providers: ProviderTable) -> Result<Self, ProxyError> {
        Self::with_timeout(providers, Duration::from_secs(DEFAULT_FORWARD_TIMEOUT_SECONDS))
    }

    pub fn with_timeout(providers: ProviderTable, timeout: Duration) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, providers })
    }

    /// Forward one admitted request to its provider (§4.5).
    #[instrument(skip(self, headers, body, credentials), fields(%provider, %method, %path))]
    pub async fn forward(
        &self,
        method: &str,
        path: &str,
        headers: &HeaderMap,
        body: Vec<u8>,
        credentials: Option<&CredentialBundle>,
        provider: &str,
    ) -> Result<(u16, Vec<u8>, HeaderMap), ProxyError> {
        let method_upper = method.to_ascii_uppercase();
        if !ACCEPTED_METHODS.contains(&method_upper.as_str()) {
            return Err(ProxyError::MethodNotAllowed(method.to_string()));
        }

        if UNSUPPORTED_HTTP_PROVIDERS.contains(&provider) {
            return Err(ProxyError::UnsupportedProvider(provider.to_string()));
        }

        let base = self.providers.base_url(provider);
        let url = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));

        let outbound_headers = build_outbound_headers(headers, provider, credentials)?;
        let reqwest_method = reqwest::Method::from_bytes(method_upper.as_bytes())
            .map_err(|_| ProxyError::MethodNotAllowed(method.to_string()))?;

        let response = self
            .client
            .request(reqwest_method, &url)
            .headers(outbound_headers)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let response_headers = scrub_response_headers(response.headers());
        let response_body = response.bytes().await?.to_vec();

        Ok((status, response_body, response_headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github_bundle() -> CredentialBundle {
        CredentialBundle::single("token", "ghs_test_token_12345".to_string())
    }

    #[test]
    fn strips_gateway_internal_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer session-token"));
        inbound.insert("x-creds", HeaderValue::from_static("default:github:personal"));
        inbound.insert("x-provider", HeaderValue::from_static("github"));
        inbound.insert("accept", HeaderValue::from_static("application/json"));

        let out = build_outbound_headers(&inbound, "github", Some(&github_bundle())).unwrap();

        assert!(!out.contains_key("x-creds"));
        assert!(!out.contains_key("x-provider"));
        assert!(out.contains_key("accept"));
    }

    #[test]
    fn github_injects_token_authorization() {
        let inbound = HeaderMap::new();
        let out = build_outbound_headers(&inbound, "github", Some(&github_bundle())).unwrap();
        assert_eq!(
            out.get("authorization").unwrap(),
            "token ghs_test_token_12345"
        );
    }

    #[test]
    fn datadog_injects_both_key_headers() {
        let mut fields = HashMap::new();
        fields.insert("api_key".to_string(), "dd-api".to_string());
        fields.insert("app_key".to_string(), "dd-app".to_string());
        let bundle = CredentialBundle::new(fields);

        let out = build_outbound_headers(&HeaderMap::new(), "datadog", Some(&bundle)).unwrap();
        assert_eq!(out.get("dd-api-key").unwrap(), "dd-api");
        assert_eq!(out.get("dd-application-key").unwrap(), "dd-app");
    }

    #[test]
    fn slack_accepts_bearer_token_field() {
        let bundle = CredentialBundle::single("bearer_token", "xoxb-abc".to_string());
        let out = build_outbound_headers(&HeaderMap::new(), "slack", Some(&bundle)).unwrap();
        assert_eq!(out.get("authorization").unwrap(), "Bearer xoxb-abc");
    }

    #[test]
    fn response_headers_are_redacted_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("token leaked"));
        headers.insert("X-Api-Key", HeaderValue::from_static("leaked"));
        headers.insert("Cookie", HeaderValue::from_static("leaked"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let scrubbed = scrub_response_headers(&headers);
        assert!(!scrubbed.contains_key("authorization"));
        assert!(!scrubbed.contains_key("x-api-key"));
        assert!(!scrubbed.contains_key("cookie"));
        assert!(scrubbed.contains_key("content-type"));
    }

    #[test]
    fn overrides_replace_defaults_and_add_new_providers() {
        let mut overrides = HashMap::new();
        overrides.insert("github".to_string(), "https://github.internal".to_string());
        overrides.insert("acme".to_string(), "https://acme.example.com".to_string());
        let table =
            ProviderTable::with_defaults_and_overrides("https://default.example.com".to_string(), overrides);
        assert_eq!(table.base_url("github"), "https://github.internal");
        assert_eq!(table.base_url("acme"), "https://acme.example.com");
        assert_eq!(table.base_url("slack"), "https://slack.com/api");
    }

    #[test]
    fn provider_table_falls_back_to_default_for_unknown_providers() {
        let table = ProviderTable::with_defaults("https://default.example.com".to_string());
        assert_eq!(table.base_url("github"), "https://api.github.com");
        assert_eq!(table.base_url("mystery"), "https://default.example.com");
    }

    #[tokio::test]
    async fn aws_is_rejected_on_the_http_forward_path() {
        let proxy = ForwardProxy::new(ProviderTable::with_defaults(
            "https://default.example.com".to_string(),
        ))
        .unwrap();
        let err = proxy
            .forward("GET", "/", &HeaderMap::new(), Vec::new(), None, "aws")
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn unrecognized_method_is_rejected() {
        let proxy = ForwardProxy::new(ProviderTable::with_defaults(
            "https://default.example.com".to_string(),
        ))
        .unwrap();
        let err = proxy
            .forward("TRACE", "/", &HeaderMap::new(), Vec::new(), None, "github")
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::MethodNotAllowed(_)));
    }
}
