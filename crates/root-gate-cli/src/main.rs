// crates/root-gate-cli/src/main.rs
// ============================================================================
// Module: Root Gate CLI Entry Point
// Description: Command dispatcher for superuser requests and policy upkeep.
// Purpose: Drive the request broker and administer stored decisions.
// Dependencies: clap, root-gate-broker, root-gate-config, root-gate-core,
//               root-gate-store-sqlite, serde, serde_json, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The Root Gate CLI runs one superuser request through the broker, prompting
//! on the terminal when the configured auto-response defers to the user, and
//! offers read/revoke/prune commands over the durable policy store. All
//! user-facing strings are routed through the message table. Security posture:
//! request arguments and configuration are untrusted and validated before use.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use root_gate_broker::BrokerAuditSink;
use root_gate_broker::BrokerConfig;
use root_gate_broker::DecisionReceipt;
use root_gate_broker::FifoOpener;
use root_gate_broker::FileAuditSink;
use root_gate_broker::NoopAuditSink;
use root_gate_broker::PendingRequest;
use root_gate_broker::RequestBroker;
use root_gate_broker::StartOutcome;
use root_gate_broker::StderrAuditSink;
use root_gate_cli::t;
use root_gate_config::AuditConfig;
use root_gate_config::AuditSinkType;
use root_gate_config::RootGateConfig;
use root_gate_core::Clock;
use root_gate_core::InMemoryPolicyStore;
use root_gate_core::Policy;
use root_gate_core::PolicyAction;
use root_gate_core::PolicyStore;
use root_gate_core::RequestDescriptor;
use root_gate_core::StaticPackageMetadata;
use root_gate_core::SystemClock;
use root_gate_core::Uid;
use root_gate_store_sqlite::SqlitePolicyStore;
use root_gate_store_sqlite::SqliteStoreConfig;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "root-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one superuser request.
    Request(RequestCommand),
    /// Stored decision administration.
    Policy {
        /// Selected policy subcommand.
        #[command(subcommand)]
        command: PolicyCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `request`.
#[derive(Args, Debug)]
struct RequestCommand {
    /// Optional config file path (defaults to root-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Decision pipe the requester is waiting on.
    #[arg(long, value_name = "PATH")]
    fifo: String,
    /// Requesting uid.
    #[arg(long, allow_hyphen_values = true)]
    uid: i32,
    /// Requesting pid (negative when unknown).
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pid: i32,
    /// Answer for interactive requests instead of prompting on stdin.
    #[arg(long, value_enum)]
    decision: Option<DecisionArg>,
    /// Decision lifetime in minutes (0 answers once, negative skips storage).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    duration: i32,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// List stored decisions.
    List(PolicyListCommand),
    /// Show the stored decision for one uid.
    Get(PolicyUidCommand),
    /// Remove the stored decision for one uid.
    Revoke(PolicyUidCommand),
    /// Remove timed decisions whose deadline has passed.
    Prune(PolicyListCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a Root Gate configuration file.
    Validate(ConfigValidateCommand),
}

/// Store location shared by policy commands.
#[derive(Args, Debug, Clone)]
struct StoreLocationArgs {
    /// Optional config file path (defaults to root-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Optional direct `SQLite` store path (overrides config).
    #[arg(long = "store-path", value_name = "PATH")]
    store_path: Option<PathBuf>,
}

/// Arguments for `policy list` and `policy prune`.
#[derive(Args, Debug)]
struct PolicyListCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for `policy get` and `policy revoke`.
#[derive(Args, Debug)]
struct PolicyUidCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Subject uid.
    #[arg(long)]
    uid: u32,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to root-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Interactive decision supplied on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum DecisionArg {
    /// Grant the request.
    Allow,
    /// Refuse the request.
    Deny,
}

/// Output formats for structured CLI commands.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// JSON output.
    Json,
    /// Human-readable text output.
    Text,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RequestOutcomeLabel {
    /// Failed closed before a decision.
    Rejected,
    /// The broker's own package asked for root.
    SelfRequestBlocked,
    /// The configured auto-response answered.
    AutoResponded,
    /// A user decision was committed.
    Decided,
}

/// Structured result of `request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct RequestOutput {
    /// Outcome label.
    outcome: RequestOutcomeLabel,
    /// Subject label when identity resolution succeeded.
    subject: Option<String>,
    /// Committed decision, if any.
    policy: Option<Policy>,
    /// Whether the decision code reached the channel.
    delivered: bool,
    /// Whether the decision was stored.
    persisted: bool,
    /// Failure reason for rejected requests.
    reason: Option<String>,
}

impl RequestOutput {
    /// Builds output for a committed decision.
    const fn decided(
        outcome: RequestOutcomeLabel,
        subject: Option<String>,
        receipt: DecisionReceipt,
    ) -> Self {
        Self {
            outcome,
            subject,
            policy: Some(receipt.policy),
            delivered: receipt.delivered,
            persisted: receipt.persisted,
            reason: None,
        }
    }
}

/// Structured result of `policy list`.
#[derive(Debug, Serialize)]
struct PolicyListOutput {
    /// Stored decisions ordered by uid.
    policies: Vec<Policy>,
}

/// Structured result of `policy revoke`.
#[derive(Debug, Serialize)]
struct PolicyRevokeOutput {
    /// Subject uid.
    uid: Uid,
    /// Whether a stored decision was removed.
    removed: bool,
}

/// Structured result of `policy prune`.
#[derive(Debug, Serialize)]
struct PolicyPruneOutput {
    /// Reference time used for expiry.
    now: i64,
    /// Number of removed decisions.
    pruned: usize,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
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

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Request(command) => command_request(command).await,
        Commands::Policy {
            command,
        } => command_policy(command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Request Command
// ============================================================================

/// Executes the `request` command.
async fn command_request(command: RequestCommand) -> CliResult<ExitCode> {
    let config = RootGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let broker = build_broker(&config)?;
    let descriptor = RequestDescriptor::new(Some(command.fifo.clone()), command.uid, command.pid);
    let outcome = broker
        .start(&descriptor)
        .await
        .map_err(|err| CliError::new(t!("request.failed", error = err)))?;

    let output = match outcome {
        StartOutcome::Rejected(failure) => RequestOutput {
            outcome: RequestOutcomeLabel::Rejected,
            subject: None,
            policy: None,
            delivered: false,
            persisted: false,
            reason: Some(failure.to_string()),
        },
        StartOutcome::SelfRequestBlocked {
            package,
        } => RequestOutput {
            outcome: RequestOutcomeLabel::SelfRequestBlocked,
            subject: Some(package.as_str().to_string()),
            policy: None,
            delivered: false,
            persisted: false,
            reason: None,
        },
        StartOutcome::AutoResponded(receipt) => {
            RequestOutput::decided(RequestOutcomeLabel::AutoResponded, None, receipt)
        }
        StartOutcome::Interactive(pending) => {
            let subject = pending.identity().label().to_string();
            let action = match resolve_decision(command.decision, &pending).await {
                Ok(action) => action,
                Err(err) => {
                    let _ = pending.abandon().await;
                    return Err(err);
                }
            };
            let receipt = pending
                .respond(action, command.duration)
                .await
                .map_err(|err| CliError::new(t!("request.failed", error = err)))?;
            RequestOutput::decided(RequestOutcomeLabel::Decided, Some(subject), receipt)
        }
    };

    let text = render_request_text(&output);
    emit_structured_output(&output, command.format, text)?;
    Ok(ExitCode::SUCCESS)
}

/// Wires a broker from validated configuration.
fn build_broker(config: &RootGateConfig) -> CliResult<RequestBroker> {
    let self_package = config
        .broker
        .self_package_name()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let records = config
        .package_records()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let opener =
        if config.broker.require_fifo { FifoOpener::fifo_only() } else { FifoOpener::new() };
    RequestBroker::builder(BrokerConfig {
        self_package,
        auto_response: config.broker.auto_response,
    })
    .metadata(Arc::new(StaticPackageMetadata::new(records)))
    .store(open_request_store(config)?)
    .opener(Arc::new(opener))
    .audit(build_audit_sink(&config.audit)?)
    .build()
    .map_err(|err| CliError::new(t!("broker.init_failed", error = err)))
}

/// Opens the configured policy store for request handling.
fn open_request_store(config: &RootGateConfig) -> CliResult<Arc<dyn PolicyStore>> {
    match config.store.sqlite_config() {
        Some(sqlite) => {
            let store = SqlitePolicyStore::new(sqlite)
                .map_err(|err| CliError::new(t!("store.open_failed", error = err)))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryPolicyStore::new())),
    }
}

/// Builds the configured audit sink.
fn build_audit_sink(config: &AuditConfig) -> CliResult<Arc<dyn BrokerAuditSink>> {
    match config.sink {
        AuditSinkType::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkType::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkType::File => {
            let Some(path) = config.path.as_deref() else {
                return Err(CliError::new(t!(
                    "config.load_failed",
                    error = "file audit sink requires path"
                )));
            };
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(t!("audit.open_failed", path = path.display(), error = err))
            })?;
            Ok(Arc::new(sink))
        }
    }
}

/// Picks the interactive decision from the flag or the terminal.
async fn resolve_decision(
    decision: Option<DecisionArg>,
    pending: &PendingRequest,
) -> CliResult<PolicyAction> {
    if let Some(decision) = decision {
        return Ok(decision.into());
    }
    let prompt =
        t!("request.prompt", subject = pending.identity().label(), uid = pending.uid());
    let answer = tokio::task::spawn_blocking(move || read_prompt_answer(&prompt))
        .await
        .map_err(|err| CliError::new(t!("request.prompt_failed", error = err)))?
        .map_err(|err| CliError::new(t!("request.prompt_failed", error = err)))?;
    Ok(parse_prompt_answer(&answer))
}

/// Writes the prompt to stderr and reads one line from stdin.
fn read_prompt_answer(prompt: &str) -> std::io::Result<String> {
    write_stderr_line(prompt)?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

/// Maps a typed answer to an action; anything unrecognized denies.
fn parse_prompt_answer(answer: &str) -> PolicyAction {
    match answer.trim().to_ascii_lowercase().as_str() {
        "allow" | "y" | "yes" => PolicyAction::Allow,
        _ => PolicyAction::Deny,
    }
}

/// Renders request output as text.
fn render_request_text(output: &RequestOutput) -> String {
    match (output.outcome, output.policy) {
        (RequestOutcomeLabel::Rejected, _) => t!(
            "request.outcome.rejected",
            reason = output.reason.as_deref().unwrap_or_default()
        ),
        (RequestOutcomeLabel::SelfRequestBlocked, _) => t!(
            "request.outcome.self_blocked",
            package = output.subject.as_deref().unwrap_or_default()
        ),
        (_, Some(policy)) => t!(
            "request.outcome.decided",
            action = policy.action.as_str(),
            uid = policy.uid,
            until = policy.until,
            delivered = output.delivered,
            persisted = output.persisted
        ),
        (_, None) => String::new(),
    }
}

// ============================================================================
// SECTION: Policy Commands
// ============================================================================

/// Dispatches policy administration subcommands.
fn command_policy(command: PolicyCommand) -> CliResult<ExitCode> {
    match command {
        PolicyCommand::List(command) => command_policy_list(&command),
        PolicyCommand::Get(command) => command_policy_get(&command),
        PolicyCommand::Revoke(command) => command_policy_revoke(&command),
        PolicyCommand::Prune(command) => command_policy_prune(&command),
    }
}

/// Executes `policy list`.
fn command_policy_list(command: &PolicyListCommand) -> CliResult<ExitCode> {
    let store = open_sqlite_store(&command.location)?;
    let policies =
        store.list().map_err(|err| CliError::new(t!("policy.list.failed", error = err)))?;
    let output = PolicyListOutput {
        policies,
    };
    let text = render_policy_list_text(&output);
    emit_structured_output(&output, command.format, text)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `policy get`.
fn command_policy_get(command: &PolicyUidCommand) -> CliResult<ExitCode> {
    let store = open_sqlite_store(&command.location)?;
    let uid = Uid::new(command.uid);
    let policy = store
        .get(uid)
        .map_err(|err| CliError::new(t!("policy.get.failed", error = err)))?
        .ok_or_else(|| CliError::new(t!("policy.get.not_found", uid = uid)))?;
    let text = render_policy_entry(&policy);
    emit_structured_output(&policy, command.format, text)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `policy revoke`.
fn command_policy_revoke(command: &PolicyUidCommand) -> CliResult<ExitCode> {
    let store = open_sqlite_store(&command.location)?;
    let uid = Uid::new(command.uid);
    let removed =
        store.delete(uid).map_err(|err| CliError::new(t!("policy.revoke.failed", error = err)))?;
    let output = PolicyRevokeOutput {
        uid,
        removed,
    };
    let text = t!("policy.revoke.done", uid = uid, removed = removed);
    emit_structured_output(&output, command.format, text)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `policy prune`.
fn command_policy_prune(command: &PolicyListCommand) -> CliResult<ExitCode> {
    let store = open_sqlite_store(&command.location)?;
    let now = SystemClock.now_unix_seconds();
    let pruned = store
        .prune_expired(now)
        .map_err(|err| CliError::new(t!("policy.prune.failed", error = err)))?;
    let output = PolicyPruneOutput {
        now,
        pruned,
    };
    let text = t!("policy.prune.done", count = pruned);
    emit_structured_output(&output, command.format, text)?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves the `SQLite` store configuration for policy commands.
fn resolve_sqlite_store_config(location: &StoreLocationArgs) -> CliResult<SqliteStoreConfig> {
    if let Some(store_path) = &location.store_path {
        return Ok(SqliteStoreConfig::for_path(store_path.clone()));
    }
    let config = RootGateConfig::load(location.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    config.store.sqlite_config().ok_or_else(|| CliError::new(t!("store.memory_unsupported")))
}

/// Opens the durable policy store for administration.
fn open_sqlite_store(location: &StoreLocationArgs) -> CliResult<SqlitePolicyStore> {
    let config = resolve_sqlite_store_config(location)?;
    SqlitePolicyStore::new(config)
        .map_err(|err| CliError::new(t!("store.open_failed", error = err)))
}

/// Renders one stored decision as text.
fn render_policy_entry(policy: &Policy) -> String {
    t!("policy.list.entry", uid = policy.uid, action = policy.action.as_str(), until = policy.until)
}

/// Renders `policy list` output as text.
fn render_policy_list_text(output: &PolicyListOutput) -> String {
    let mut lines = vec![t!("policy.list.header", count = output.policies.len())];
    lines.extend(output.policies.iter().map(render_policy_entry));
    lines.join("\n")
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = RootGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Converts CLI decisions into policy actions.
impl From<DecisionArg> for PolicyAction {
    fn from(value: DecisionArg) -> Self {
        match value {
            DecisionArg::Allow => Self::Allow,
            DecisionArg::Deny => Self::Deny,
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Emits JSON or text output for a structured command.
fn emit_structured_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: String,
) -> CliResult<()> {
    let line = match format {
        OutputFormat::Json => serde_json::to_string(value)
            .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?,
        OutputFormat::Text => text,
    };
    write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))
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

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
