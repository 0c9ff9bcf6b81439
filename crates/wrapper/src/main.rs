//! `breakwater-wrapper` -- the executable half of the wrapper contract
//! (§4.7). Invoked by the (out-of-scope) restricted-shell demultiplexer
//! as `breakwater-wrapper <tool> <tool argv...>`, or directly by an
//! operator testing one tool's admission path by hand.

use std::process::Command;

use clap::Parser;
use tracing::{error, info, instrument};

use breakwater_client::GatewayClient;
use breakwater_wrapper::{DEFAULT_APPROVAL_WAIT, Invocation, WrapperError, admit};

/// Runs one tool invocation through the admission pipeline, then execs it.
#[derive(Parser, Debug)]
#[command(
    name = "breakwater-wrapper",
    about = "Classify, gate, and credential-inject one tool invocation before exec'ing it"
)]
struct Cli {
    /// Provider/tool name used for both classification (§4.3) and
    /// credential injection (§4.7 step 4b), e.g. `aws`, `kubectl`, `gh`.
    provider: String,

    /// The tool's own argv, forwarded verbatim to the exec'd child
    /// (§4.7 step 4c). Everything after `--` is passed through untouched.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}

/// Returns the process exit code (§6: 0 success, 1 admission/execution
/// failure, otherwise whatever the wrapped tool returned). Never panics
/// on an admission failure -- every error path below maps to a generic
/// exit(1) rather than propagating any credential or policy detail to
/// stdout/stderr (§4.7's closing sentence, §7's redaction policy).
#[instrument(skip(cli), fields(provider = %cli.provider))]
async fn run(cli: Cli) -> i32 {
    let gateway_url = match std::env::var("GATEWAY_URL") {
        Ok(v) => v,
        Err(_) => {
            error!("GATEWAY_URL is not set");
            return 1;
        }
    };
    let session_token = match std::env::var("GATEWAY_SESSION_TOKEN") {
        Ok(v) => v,
        Err(_) => {
            error!("GATEWAY_SESSION_TOKEN is not set");
            return 1;
        }
    };
    let tenant_id = match std::env::var("GATEWAY_TENANT_ID") {
        Ok(v) => v,
        Err(_) => {
            error!("GATEWAY_TENANT_ID is not set");
            return 1;
        }
    };
    let creds_selector = std::env::var("GATEWAY_CREDS").ok();

    let client = match GatewayClient::new(&gateway_url) {
        Ok(c) => c.with_session_token(session_token),
        Err(e) => {
            error!(error = %e, "failed to build gateway client");
            return 1;
        }
    };

    let command_line = cli.argv.join(" ");
    let invocation = Invocation {
        tenant_id,
        provider: cli.provider.clone(),
        command_line,
    };
    let classification = invocation.classification();
    info!(?classification, "classified invocation");

    let outcome = match admit(&client, &invocation, creds_selector.as_deref(), DEFAULT_APPROVAL_WAIT).await {
        Ok(outcome) => outcome,
        Err(WrapperError::Denied(id, status)) => {
            error!(%id, %status, "write was not approved");
            return 1;
        }
        Err(e) => {
            error!(error = %e, "admission failed");
            return 1;
        }
    };

    exec_tool(&cli.provider, &cli.argv, outcome.bundle.as_ref())
}

/// Step 4-5 of §4.7: build the scrubbed, credential-injected child
/// environment and replace the current process image with the real
/// tool. On unix this uses `exec`, so on success this function never
/// returns -- the calling process becomes the tool and its exit code
/// *is* this wrapper's exit code, with no wrapper process left to relay
/// it. `exec` failing (tool not found, not executable, ...) is the one
/// path that does return, and is itself an admission/execution failure.
fn exec_tool(
    provider: &str,
    argv: &[String],
    bundle: Option<&breakwater_core::CredentialBundle>,
) -> i32 {
    let parent_env = std::env::vars();
    let child_env = breakwater_wrapper::env::build_child_env(parent_env, provider, bundle);

    let mut command = Command::new(provider);
    command.args(argv);
    command.env_clear();
    command.envs(child_env);

    exec_or_spawn(command, provider)
}

/// Replaces the current process image on unix via `exec`, so exit-code
/// propagation is exact and there is no wrapper process left to relay
/// it (§9's "likely source bug to preserve as a fix, not a TODO" -- the
/// teacher's own dispatcher stubbed this step).
#[cfg(unix)]
fn exec_or_spawn(mut command: Command, provider: &str) -> i32 {
    use std::os::unix::process::CommandExt;
    let err = command.exec();
    error!(error = %err, tool = %provider, "failed to exec tool");
    1
}

/// `exec` has no portable equivalent off unix; spawn the child and
/// relay its exit code instead.
#[cfg(not(unix))]
fn exec_or_spawn(mut command: Command, provider: &str) -> i32 {
    match command.status() {
        Ok(status) => status.code().unwrap_or(1),
        Err(err) => {
            error!(error = %err, tool = %provider, "failed to spawn tool");
            1
        }
    }
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
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
