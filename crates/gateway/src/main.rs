use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use breakwater_approval::ApprovalOrchestrator;
use breakwater_broker::CredentialBroker;
use breakwater_core::PolicyRecord;
use breakwater_gateway::api;
use breakwater_gateway::config::{
    self, ConfigWatcher, GatewayConfig, build_approval_keys, load_credentials, load_enrollments,
    load_policies,
};
use breakwater_gateway::state::AppState;
use breakwater_policy::PolicyTable;
use breakwater_proxy::{ForwardProxy, ProviderTable};
use breakwater_session::{EnrollmentTable, SessionManager};

/// Breakwater gateway HTTP server.
#[derive(Parser, Debug)]
#[command(name = "breakwater-gateway", about = "Trust gateway HTTP server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "breakwater.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();

    let config = if Path::new(&cli.config).exists() {
        GatewayConfig::load(Path::new(&cli.config))?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        toml::from_str("")?
    };

    let enrollments = load_enrollment_table(&config)?;
    let sessions = Arc::new(SessionManager::new(enrollments, config.session.ttl_seconds));

    let static_credentials = load_credential_map(&config)?;
    let broker = Arc::new(CredentialBroker::new(static_credentials));

    let default_policy = if config.policy.default_mode_strict {
        PolicyRecord::strict()
    } else {
        PolicyRecord {
            mode: breakwater_core::PolicyMode::Cautious,
            exceptions: Vec::new(),
        }
    };
    let policy_records = load_policy_table(&config)?;
    let policies = Arc::new(PolicyTable::new(policy_records, default_policy));

    let approvals = Arc::new(ApprovalOrchestrator::new(config.approval.ttl_seconds));

    let providers = build_provider_table(&config);
    let proxy = Arc::new(ForwardProxy::with_timeout(
        providers,
        Duration::from_secs(config.proxy.timeout_seconds),
    )?);

    let approval_keys = build_approval_keys(&config.approval.keys)?;

    let config = Arc::new(config);

    if config.session.watch {
        if let Some(path) = config.session.enrollments_file.clone() {
            spawn_enrollment_watcher(Arc::clone(&sessions), path);
        }
    }
    if config.proxy.watch {
        if let Some(path) = config.proxy.credentials_file.clone() {
            spawn_credential_watcher(Arc::clone(&broker), path);
        }
    }
    if config.policy.watch {
        if let Some(path) = config.policy.policies_file.clone() {
            spawn_policy_watcher(Arc::clone(&policies), path);
        }
    }

    spawn_sweeper(Arc::clone(&sessions), Arc::clone(&approvals));

    let state = AppState {
        sessions,
        broker,
        policies,
        approvals,
        proxy,
        approval_keys,
        config: Arc::clone(&config),
    };
    let app = api::router(state);

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "breakwater-gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("breakwater-gateway shut down");
    Ok(())
}

fn init_tracing() {
    let debug = std::env::var("DEBUG").is_ok_and(|v| v == "1");
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .ok()
        .and_then(|v| tracing_subscriber::EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "info" })
        });

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if debug {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn load_enrollment_table(config: &GatewayConfig) -> Result<EnrollmentTable, config::ConfigError> {
    match &config.session.enrollments_file {
        Some(path) => Ok(EnrollmentTable::new(load_enrollments(Path::new(path))?)),
        None => Ok(EnrollmentTable::default()),
    }
}

fn load_credential_map(
    config: &GatewayConfig,
) -> Result<HashMap<String, breakwater_core::CredentialBundle>, config::ConfigError> {
    match &config.proxy.credentials_file {
        Some(path) => load_credentials(Path::new(path)),
        None => Ok(HashMap::new()),
    }
}

fn load_policy_table(
    config: &GatewayConfig,
) -> Result<HashMap<breakwater_core::TenantId, PolicyRecord>, config::ConfigError> {
    match &config.policy.policies_file {
        Some(path) => load_policies(Path::new(path)),
        None => Ok(HashMap::new()),
    }
}

fn build_provider_table(config: &GatewayConfig) -> ProviderTable {
    ProviderTable::with_defaults_and_overrides(
        config.proxy.default_base_url.clone(),
        config.proxy.provider_base_urls.clone(),
    )
}

fn spawn_enrollment_watcher(sessions: Arc<SessionManager>, path: String) {
    let watcher = ConfigWatcher::new(PathBuf::from(path), "enrollments", move |p| {
        match load_enrollments(p) {
            Ok(records) => sessions.reload_enrollments(EnrollmentTable::new(records)),
            Err(e) => tracing::error!(error = %e, "failed to reload enrollments"),
        }
    });
    watcher.spawn();
}

fn spawn_credential_watcher(broker: Arc<CredentialBroker>, path: String) {
    let watcher = ConfigWatcher::new(PathBuf::from(path), "credentials", move |p| {
        match load_credentials(p) {
            Ok(bundles) => broker.reload_static(bundles),
            Err(e) => tracing::error!(error = %e, "failed to reload credentials"),
        }
    });
    watcher.spawn();
}

fn spawn_policy_watcher(policies: Arc<PolicyTable>, path: String) {
    let watcher = ConfigWatcher::new(PathBuf::from(path), "policies", move |p| {
        match load_policies(p) {
            Ok(records) => policies.reload(records),
            Err(e) => tracing::error!(error = %e, "failed to reload policies"),
        }
    });
    watcher.spawn();
}

/// Evict expired sessions and sweep timed-out approvals on a fixed tick,
/// so TTLs are enforced even for ids nobody is actively polling.
fn spawn_sweeper(sessions: Arc<SessionManager>, approvals: Arc<ApprovalOrchestrator>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let expired_sessions = sessions.sweep_expired();
            let expired_approvals = approvals.sweep_expired();
            if expired_sessions > 0 || expired_approvals > 0 {
                info!(expired_sessions, expired_approvals, "swept expired state");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
