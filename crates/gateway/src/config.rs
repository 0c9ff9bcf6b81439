//! Gateway configuration: the TOML-driven bind address, component TTLs,
//! and provider table, plus the JSON-file loaders for the three
//! hot-reloadable tables (enrollments, static credentials, policies) and a
//! `notify`-based watcher that reloads them on change.
//!
//! Grounded on `acteon-server::config::ActeonConfig`'s `#[serde(default)]`
//! TOML shape and `acteon-server::auth::watcher::AuthWatcher`'s debounced
//! file-watch loop, trimmed to the handful of sections Breakwater needs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use breakwater_core::{CredentialBundle, EnrollmentRecord, PolicyRecord, TenantId};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse JSON config file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid hex secret for approval key '{id}': {source}")]
    InvalidHex {
        id: String,
        #[source]
        source: hex::FromHexError,
    },
}

fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Bind + component configuration, loaded from TOML at startup (§6, §10.3).
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub approval: ApprovalSection,
    #[serde(default)]
    pub proxy: ProxySection,
    #[serde(default)]
    pub policy: PolicySection,
}

impl GatewayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_to_string(path)?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub ttl_seconds: i64,
    /// Path to the JSON enrollment table (`{tenant_id: secret_digest_hex}`).
    pub enrollments_file: Option<String>,
    pub watch: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            ttl_seconds: breakwater_core::DEFAULT_SESSION_TTL_SECONDS,
            enrollments_file: None,
            watch: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    pub ttl_seconds: i64,
    pub wait_timeout_seconds: u64,
    /// Hex-encoded HMAC keys for signing approval links, most-current first.
    pub keys: Vec<ApprovalKeyConfig>,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self {
            ttl_seconds: breakwater_core::DEFAULT_APPROVAL_TTL_SECONDS,
            wait_timeout_seconds: 300,
            keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalKeyConfig {
    pub id: String,
    /// Hex-encoded secret bytes.
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxySection {
    pub timeout_seconds: u64,
    pub default_base_url: String,
    pub provider_base_urls: HashMap<String, String>,
    /// Path to the JSON static credential table
    /// (`{"<tenant>:<selector>": {field: value}}`).
    pub credentials_file: Option<String>,
    pub watch: bool,
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            timeout_seconds: breakwater_proxy::DEFAULT_FORWARD_TIMEOUT_SECONDS,
            default_base_url: "https://api.example.com".to_string(),
            provider_base_urls: HashMap::new(),
            credentials_file: None,
            watch: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Path to the JSON policy table (`{tenant_id: PolicyRecord}`).
    pub policies_file: Option<String>,
    pub default_mode_strict: bool,
    pub watch: bool,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            policies_file: None,
            default_mode_strict: true,
            watch: true,
        }
    }
}

/// Parse the JSON enrollment file: `{"<tenant_id>": "<secret_digest_hex>"}`.
pub fn load_enrollments(path: &Path) -> Result<Vec<EnrollmentRecord>, ConfigError> {
    let contents = read_to_string(path)?;
    let raw: HashMap<String, String> = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Ok(raw
        .into_iter()
        .map(|(tenant_id, secret_digest_hex)| EnrollmentRecord {
            tenant_id: TenantId::from(tenant_id),
            secret_digest_hex,
        })
        .collect())
}

/// Parse the JSON static credential file:
/// `{"<tenant>:<selector>": {"<field>": "<value>"}}`.
pub fn load_credentials(path: &Path) -> Result<HashMap<String, CredentialBundle>, ConfigError> {
    let contents = read_to_string(path)?;
    let raw: HashMap<String, HashMap<String, String>> =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })?;
    Ok(raw
        .into_iter()
        .map(|(key, fields)| (key, CredentialBundle::new(fields)))
        .collect())
}

/// Parse the JSON policy file: `{"<tenant_id>": PolicyRecord}`.
pub fn load_policies(path: &Path) -> Result<HashMap<TenantId, PolicyRecord>, ConfigError> {
    let contents = read_to_string(path)?;
    let raw: HashMap<String, PolicyRecord> = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Ok(raw.into_iter().map(|(k, v)| (TenantId::from(k), v)).collect())
}

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches one config file for changes and invokes `on_change` after the
/// filesystem settles, matching `AuthWatcher`'s debounce-then-reload loop
/// but generalized over the reload action so it can drive any of the
/// three config tables.
pub struct ConfigWatcher<F> {
    path: PathBuf,
    label: &'static str,
    debounce: Duration,
    on_change: F,
}

impl<F> ConfigWatcher<F>
where
    F: Fn(&Path) + Send + Sync + 'static,
{
    pub fn new(path: impl Into<PathBuf>, label: &'static str, on_change: F) -> Self {
        Self {
            path: path.into(),
            label,
            debounce: DEFAULT_DEBOUNCE,
            on_change,
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!(label = self.label, error = %e, "config watcher exited with error");
            }
        })
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(16);

        let watch_dir = self.path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let filename = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();

        let _watcher: RecommendedWatcher = {
            let tx = tx.clone();
            let filename = filename.clone();
            let mut watcher = RecommendedWatcher::new(
                move |res: Result<notify::Event, notify::Error>| match res {
                    Ok(event) => {
                        if is_relevant_event(event.kind)
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name().is_some_and(|n| n == filename.as_os_str()))
                        {
                            let _ = tx.try_send(());
                        }
                    }
                    Err(e) => warn!(error = %e, "filesystem watcher error"),
                },
                notify::Config::default(),
            )?;
            watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
            info!(label = self.label, path = %self.path.display(), "config watcher started");
            watcher
        };

        loop {
            if rx.recv().await.is_none() {
                debug!(label = self.label, "config watcher channel closed");
                break;
            }
            tokio::time::sleep(self.debounce).await;
            while rx.try_recv().is_ok() {}
            info!(label = self.label, path = %self.path.display(), "reloading config");
            (self.on_change)(&self.path);
        }

        Ok(())
    }
}

fn is_relevant_event(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Decode every key's hex secret into an [`crate::approval_keys::ApprovalKeySet`].
pub fn build_approval_keys(
    configured: &[ApprovalKeyConfig],
) -> Result<crate::approval_keys::ApprovalKeySet, ConfigError> {
    if configured.is_empty() {
        // No operator-configured keys: mint one ephemeral key for this
        // process. Links signed with it do not survive a restart, which is
        // acceptable for a first-run/dev setup but should be overridden in
        // any deployment that needs link stability across restarts.
        let secret = breakwater_crypto::generate_token().into_bytes();
        return Ok(crate::approval_keys::ApprovalKeySet::from_single(secret));
    }
    let keys = configured
        .iter()
        .map(|kc| {
            let secret = hex::decode(&kc.secret).map_err(|source| ConfigError::InvalidHex {
                id: kc.id.clone(),
                source,
            })?;
            Ok(crate::approval_keys::ApprovalKey {
                kid: kc.id.clone(),
                secret,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    Ok(crate::approval_keys::ApprovalKeySet::new(keys))
}
