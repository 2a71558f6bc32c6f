// crates/hello-action-cli/src/main.rs
// ============================================================================
// Module: Hello Action CLI Entry Point
// Description: Command dispatcher for serving and exercising the action.
// Purpose: Bootstrap keys, run the server, and sign test interactions.
// Dependencies: clap, hello-action-config, hello-action-core, hello-action-server, reqwest, tokio
// ============================================================================

//! ## Overview
//! - `serve` resolves the trusted public key (flag, then
//!   `HELLO_ACTION_PUBLIC_KEY`, then config), generating a pair when none is
//!   given or only a scheme name is, and starts the HTTP server.
//! - `keygen` prints a fresh key pair.
//! - `invoke` fetches metadata from a running action and posts a signed
//!   `/hello-action` command.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use hello_action_config::HelloActionConfig;
use hello_action_core::PrivateKey;
use hello_action_core::PublicKey;
use hello_action_core::SignatureScheme;
use hello_action_core::keys::generate;
use hello_action_core::signature::TIMESTAMP_HEADER;
use hello_action_core::signature::sign_request;
use hello_action_server::ActionServer;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable overriding the configured public key.
const PUBLIC_KEY_ENV: &str = "HELLO_ACTION_PUBLIC_KEY";
/// Timeout for `invoke` HTTP calls.
const INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "hello-action", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the action HTTP server.
    Serve(ServeCommand),
    /// Generate a signing key pair.
    Keygen(KeygenCommand),
    /// Send a signed `/hello-action` command to a running action.
    Invoke(InvokeCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to hello-action.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Trusted public key as `scheme:hex`, or a bare scheme name to generate one.
    #[arg(long, value_name = "KEY")]
    public_key: Option<String>,
}

/// Configuration for the `keygen` command.
#[derive(Args, Debug)]
struct KeygenCommand {
    /// Signature scheme of the new pair.
    #[arg(long, value_enum, default_value_t = SchemeArg::Ed25519)]
    scheme: SchemeArg,
}

/// Configuration for the `invoke` command.
#[derive(Args, Debug)]
struct InvokeCommand {
    /// Action base URL, e.g. `http://127.0.0.1:3000/hello-action`.
    #[arg(long, value_name = "URL")]
    url: String,
    /// Private signing key as `scheme:hex`.
    #[arg(long, value_name = "KEY")]
    signing_key: String,
    /// Value passed as the `your-name` option.
    #[arg(long, default_value = "John")]
    name: String,
}

/// Signature scheme argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemeArg {
    /// ECDSA over secp256k1.
    Ecdsa,
    /// Ed25519.
    Ed25519,
}

impl From<SchemeArg> for SignatureScheme {
    fn from(value: SchemeArg) -> Self {
        match value {
            SchemeArg::Ecdsa => Self::Ecdsa,
            SchemeArg::Ed25519 => Self::Ed25519,
        }
    }
}

/// Key pair printed by `keygen`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyPairOutput {
    /// Scheme label.
    scheme: &'static str,
    /// Public key as `scheme:hex`.
    public_key: String,
    /// Private key as `scheme:hex`.
    private_key: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Keygen(command) => command_keygen(&command),
        Commands::Invoke(command) => command_invoke(command).await,
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = HelloActionConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let requested = command.public_key.or_else(|| std::env::var(PUBLIC_KEY_ENV).ok());
    if let Some(signing_key) = install_public_key(&mut config, requested)? {
        write_stdout_line(&format!("Action signing key: {}", signing_key.to_key_string()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    let server = ActionServer::from_config(&config)
        .map_err(|err| CliError::new(format!("failed to initialize server: {err}")))?;
    write_stderr_line(&format!(
        "hello-action listening on http://{}{}",
        server.bind_addr(),
        config.server.base_path
    ))
    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Installs the trusted public key into `config` before the server starts.
///
/// `requested` takes precedence over the configured key. When neither holds a
/// key, or the value is a bare scheme name, a pair is generated and its
/// private half returned so it can be shown to the operator.
fn install_public_key(
    config: &mut HelloActionConfig,
    requested: Option<String>,
) -> CliResult<Option<PrivateKey>> {
    let requested =
        requested.map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
    let generate_scheme = match requested.as_deref() {
        Some(value) => SignatureScheme::from_label(value),
        None => config
            .auth
            .scheme_to_generate()
            .map_err(|err| CliError::new(format!("invalid config: {err}")))?,
    };
    if let Some(scheme) = generate_scheme {
        let pair = generate(scheme);
        config.auth.public_key = Some(pair.public.to_key_string());
        return Ok(Some(pair.private));
    }
    let key = match requested {
        Some(value) => PublicKey::parse(&value)
            .map_err(|err| CliError::new(format!("invalid public key: {err}")))?,
        None => config
            .auth
            .public_key()
            .map_err(|err| CliError::new(format!("invalid config: {err}")))?
            .ok_or_else(|| CliError::new("auth.public_key is required".to_string()))?,
    };
    config.auth.public_key = Some(key.to_key_string());
    Ok(None)
}

// ============================================================================
// SECTION: Keygen Command
// ============================================================================

/// Executes the `keygen` command.
fn command_keygen(command: &KeygenCommand) -> CliResult<ExitCode> {
    let pair = generate(command.scheme.into());
    let output = KeyPairOutput {
        scheme: pair.public.scheme().as_str(),
        public_key: pair.public.to_key_string(),
        private_key: pair.private.to_key_string(),
    };
    write_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Invoke Command
// ============================================================================

/// Executes the `invoke` command.
async fn command_invoke(command: InvokeCommand) -> CliResult<ExitCode> {
    let signing_key = PrivateKey::parse(&command.signing_key)
        .map_err(|err| CliError::new(format!("invalid signing key: {err}")))?;
    let base = command.url.trim_end_matches('/');
    let client = reqwest::Client::builder()
        .timeout(INVOKE_TIMEOUT)
        .build()
        .map_err(|err| CliError::new(format!("http client init failed: {err}")))?;

    let metadata = fetch_json(client.get(format!("{base}/metadata"))).await?;
    write_json(&metadata)?;

    let body = serde_json::to_vec(&mock_command(&command.name, now_ms()))
        .map_err(|err| CliError::new(format!("failed to encode interaction: {err}")))?;
    let timestamp = now_ms().to_string();
    let signature = sign_request(&signing_key, &timestamp, &body);
    let response = fetch_json(
        client
            .post(format!("{base}/interactions"))
            .header(TIMESTAMP_HEADER, timestamp)
            .header(signature.header, signature.value)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body),
    )
    .await?;
    write_json(&response)?;
    Ok(ExitCode::SUCCESS)
}

/// Sends `request` and parses a successful JSON reply.
async fn fetch_json(request: reqwest::RequestBuilder) -> CliResult<Value> {
    let response =
        request.send().await.map_err(|err| CliError::new(format!("request failed: {err}")))?;
    let status = response.status();
    let text =
        response.text().await.map_err(|err| CliError::new(format!("request failed: {err}")))?;
    if !status.is_success() {
        return Err(CliError::new(format!("action returned {status}: {text}")));
    }
    serde_json::from_str(&text).map_err(|err| CliError::new(format!("invalid json reply: {err}")))
}

/// Builds the mocked `/hello-action your-name:<name>` interaction.
fn mock_command(name: &str, nonce: u128) -> Value {
    json!({
        "id": format!("cli-{nonce}"),
        "type": 2,
        "application_id": "hello-action-cli",
        "token": format!("cli-token-{nonce}"),
        "data": {
            "id": "hello-action",
            "name": "hello-action",
            "type": 1,
            "options": [{"name": "your-name", "type": 3, "value": name}]
        },
        "user": {"id": "0", "username": "hello-action-cli", "discriminator": "0000"},
        "locale": "en-US"
    })
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Writes a value as canonical JSON followed by a newline.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    bytes.push(b'\n');
    std::io::stdout().write_all(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
