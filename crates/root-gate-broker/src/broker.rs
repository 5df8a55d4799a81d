// crates/root-gate-broker/src/broker.rs
// ============================================================================
// Module: Root Gate Request Broker
// Description: Orchestrates identity resolution, the self guard, and decisions.
// Purpose: Service one superuser request from descriptor to closed channel.
// Dependencies: root-gate-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`RequestBroker::start`] validates a [`RequestDescriptor`], resolves the
//! caller's identity, opens its decision channel, and then either blocks a
//! self-request, answers automatically, or hands back a [`PendingRequest`]
//! for interactive arbitration. [`PendingRequest::respond`] commits the
//! decision: write once, close, persist when `until >= 0`.
//! Invariants:
//! - Malformed descriptors never open a channel.
//! - The broker's own package never receives a decision or a policy row.
//! - The channel is released on every exit path, including panics.
//! - Unexpected failures surface as [`BrokerError::Unexpected`] and are never
//!   folded into a deny.
//!
//! Security posture: descriptors, package metadata, and channel paths are
//! untrusted; every expected failure fails the single request closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use root_gate_core::AutoResponse;
use root_gate_core::ChannelOpener;
use root_gate_core::Clock;
use root_gate_core::CommandRunner;
use root_gate_core::Identity;
use root_gate_core::IdentityResolver;
use root_gate_core::PackageMetadata;
use root_gate_core::PackageName;
use root_gate_core::Pid;
use root_gate_core::Policy;
use root_gate_core::PolicyAction;
use root_gate_core::PolicyStore;
use root_gate_core::RequestDescriptor;
use root_gate_core::RequestRejection;
use root_gate_core::ResolveError;
use root_gate_core::SystemClock;
use root_gate_core::Uid;
use root_gate_core::ValidatedRequest;
use thiserror::Error;
use tokio::task::spawn_blocking;

use crate::audit::BrokerAuditEvent;
use crate::audit::BrokerAuditSink;
use crate::audit::BrokerEventKind;
use crate::audit::NoopAuditSink;
use crate::channel::DecisionChannel;
use crate::channel::FifoOpener;
use crate::command::ShellCommandRunner;
use crate::command::uninstall_command;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by the request broker.
///
/// # Invariants
/// - Expected request failures are reported through [`StartOutcome::Rejected`],
///   never through this type.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Builder is missing a required collaborator.
    #[error("broker collaborator is not configured: {0}")]
    MissingCollaborator(&'static str),
    /// The broker itself failed in an unexpected way.
    #[error("unexpected broker failure: {0}")]
    Unexpected(String),
}

/// Reasons a single request failed closed during initialization.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Descriptor failed validation.
    #[error(transparent)]
    Rejected(#[from] RequestRejection),
    /// Caller identity could not be resolved.
    #[error(transparent)]
    Identity(ResolveError),
    /// Decision channel could not be opened.
    #[error("decision channel open failed: {0}")]
    ChannelOpen(String),
}

/// Tagged initialization failure separating handled from fatal outcomes.
#[derive(Debug)]
enum InitFailure {
    /// Request cannot be serviced; fail it closed.
    Recoverable(RequestFailure),
    /// Broker defect; propagate.
    Unexpected(String),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Immutable broker configuration injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Package identity of the broker application itself.
    pub self_package: PackageName,
    /// Standing auto-response consulted before prompting.
    pub auto_response: AutoResponse,
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// What happened to a committed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionReceipt {
    /// Decision record built for the request.
    pub policy: Policy,
    /// Whether the decision code reached the channel.
    pub delivered: bool,
    /// Whether the policy was written to the store.
    pub persisted: bool,
}

/// Result of [`RequestBroker::start`].
#[derive(Debug)]
pub enum StartOutcome {
    /// Request failed closed; no decision was written.
    Rejected(RequestFailure),
    /// The broker's own package asked for root; uninstall was requested.
    SelfRequestBlocked {
        /// Package that was blocked.
        package: PackageName,
    },
    /// The auto-response policy answered the request.
    AutoResponded(DecisionReceipt),
    /// The request awaits an interactive decision.
    Interactive(PendingRequest),
}

impl StartOutcome {
    /// Returns true when an external collaborator must call
    /// [`PendingRequest::respond`].
    #[must_use]
    pub const fn requires_interaction(&self) -> bool {
        matches!(self, Self::Interactive(_))
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for a request broker.
///
/// # Invariants
/// - `build` succeeds only when package metadata and a policy store are set.
/// - Unset optional collaborators fall back to production defaults.
pub struct RequestBrokerBuilder {
    /// Broker configuration.
    config: BrokerConfig,
    /// Package metadata service.
    metadata: Option<Arc<dyn PackageMetadata>>,
    /// Policy store.
    store: Option<Arc<dyn PolicyStore>>,
    /// Channel opener.
    opener: Option<Arc<dyn ChannelOpener>>,
    /// Remediation command runner.
    commands: Option<Arc<dyn CommandRunner>>,
    /// Time source.
    clock: Option<Arc<dyn Clock>>,
    /// Audit sink.
    audit: Option<Arc<dyn BrokerAuditSink>>,
}

impl RequestBrokerBuilder {
    /// Sets the package metadata service.
    #[must_use]
    pub fn metadata(mut self, metadata: Arc<dyn PackageMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the policy store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn PolicyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the channel opener (default: [`FifoOpener::fifo_only`]).
    #[must_use]
    pub fn opener(mut self, opener: Arc<dyn ChannelOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Sets the command runner (default: [`ShellCommandRunner`]).
    #[must_use]
    pub fn commands(mut self, commands: Arc<dyn CommandRunner>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Sets the clock (default: [`SystemClock`]).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the audit sink (default: [`NoopAuditSink`]).
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn BrokerAuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Builds the broker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::MissingCollaborator`] when metadata or the store
    /// is not configured.
    pub fn build(self) -> Result<RequestBroker, BrokerError> {
        let metadata = self.metadata.ok_or(BrokerError::MissingCollaborator("metadata"))?;
        let store = self.store.ok_or(BrokerError::MissingCollaborator("store"))?;
        Ok(RequestBroker {
            config: self.config,
            resolver: IdentityResolver::new(metadata),
            opener: self.opener.unwrap_or_else(|| Arc::new(FifoOpener::fifo_only())),
            commands: self.commands.unwrap_or_else(|| Arc::new(ShellCommandRunner)),
            commit: CommitContext {
                store,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                audit: self.audit.unwrap_or_else(|| Arc::new(NoopAuditSink)),
            },
        })
    }
}

// ============================================================================
// SECTION: Request Broker
// ============================================================================

/// Superuser request broker.
///
/// A broker is cheap to share behind an [`Arc`]; each [`RequestBroker::start`]
/// call services one independent request.
pub struct RequestBroker {
    /// Broker configuration.
    config: BrokerConfig,
    /// Identity resolver.
    resolver: IdentityResolver,
    /// Channel opener.
    opener: Arc<dyn ChannelOpener>,
    /// Remediation command runner.
    commands: Arc<dyn CommandRunner>,
    /// Collaborators needed to commit decisions.
    commit: CommitContext,
}

impl RequestBroker {
    /// Returns a builder for the broker.
    #[must_use]
    pub fn builder(config: BrokerConfig) -> RequestBrokerBuilder {
        RequestBrokerBuilder {
            config,
            metadata: None,
            store: None,
            opener: None,
            commands: None,
            clock: None,
            audit: None,
        }
    }

    /// Returns the broker configuration.
    #[must_use]
    pub const fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Starts servicing a request.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Unexpected`] when identity lookup hits an
    /// internal fault or a blocking task fails.
    pub async fn start(&self, descriptor: &RequestDescriptor) -> Result<StartOutcome, BrokerError> {
        let request = match descriptor.validate() {
            Ok(request) => request,
            Err(rejection) => {
                self.commit.audit.record(
                    &BrokerAuditEvent::new(BrokerEventKind::RequestRejected)
                        .with_reason(rejection.to_string()),
                );
                return Ok(StartOutcome::Rejected(rejection.into()));
            }
        };

        let resolver = self.resolver.clone();
        let opener = Arc::clone(&self.opener);
        let init_request = request.clone();
        let self_package = self.config.self_package.clone();
        let init = spawn_blocking(move || {
            initialize(&resolver, opener.as_ref(), &init_request, &self_package)
        })
        .await
        .map_err(|err| BrokerError::Unexpected(format!("initialization task failed: {err}")))?;
        let Initialized {
            identity,
            channel,
            is_self,
        } = match init {
            Ok(initialized) => initialized,
            Err(InitFailure::Recoverable(failure)) => {
                self.commit.audit.record(
                    &caller_event(BrokerEventKind::RequestRejected, &request)
                        .with_reason(failure.to_string()),
                );
                return Ok(StartOutcome::Rejected(failure));
            }
            Err(InitFailure::Unexpected(cause)) => return Err(BrokerError::Unexpected(cause)),
        };

        if is_self {
            let package = self.config.self_package.clone();
            self.block_self_request(&request, package.clone(), channel).await?;
            return Ok(StartOutcome::SelfRequestBlocked {
                package,
            });
        }

        let pending = PendingRequest {
            request,
            identity,
            channel,
            commit: self.commit.clone(),
        };
        let action = match self.config.auto_response {
            AutoResponse::Prompt => {
                self.commit.audit.record(
                    &caller_event(BrokerEventKind::InteractiveRequired, &pending.request)
                        .with_subject(pending.identity.label()),
                );
                return Ok(StartOutcome::Interactive(pending));
            }
            AutoResponse::Deny => PolicyAction::Deny,
            AutoResponse::Allow => PolicyAction::Allow,
        };
        let audit = Arc::clone(&self.commit.audit);
        let event = caller_event(BrokerEventKind::AutoResponded, &pending.request)
            .with_subject(pending.identity.label());
        let receipt = pending.respond(action, 0).await?;
        audit.record(&event.with_decision(action, receipt.policy.until));
        Ok(StartOutcome::AutoResponded(receipt))
    }

    /// Requests removal of an impersonating package and closes its channel
    /// without writing a decision.
    async fn block_self_request(
        &self,
        request: &ValidatedRequest,
        package: PackageName,
        mut channel: DecisionChannel,
    ) -> Result<(), BrokerError> {
        let commands = Arc::clone(&self.commands);
        let audit = Arc::clone(&self.commit.audit);
        let request = request.clone();
        spawn_blocking(move || {
            if let Some(command) = uninstall_command(&package) {
                commands.spawn_detached(&command);
            }
            audit.record(
                &caller_event(BrokerEventKind::SelfRequestBlocked, &request)
                    .with_subject(package.as_str()),
            );
            release_channel(&mut channel, audit.as_ref(), &request);
        })
        .await
        .map_err(|err| BrokerError::Unexpected(format!("self guard task failed: {err}")))
    }
}

// ============================================================================
// SECTION: Pending Requests
// ============================================================================

/// Request awaiting an interactive decision.
///
/// Holds the open channel; dropping it without responding closes the
/// channel with no data, which the requester reads as a denial.
pub struct PendingRequest {
    /// Validated request.
    request: ValidatedRequest,
    /// Resolved caller identity.
    identity: Identity,
    /// Open decision channel.
    channel: DecisionChannel,
    /// Collaborators needed to commit the decision.
    commit: CommitContext,
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("request", &self.request)
            .field("identity", &self.identity)
            .field("channel_state", &self.channel.state())
            .finish_non_exhaustive()
    }
}

impl PendingRequest {
    /// Returns the resolved caller identity.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the requesting uid.
    #[must_use]
    pub const fn uid(&self) -> Uid {
        self.request.uid
    }

    /// Returns the requesting pid, when known.
    #[must_use]
    pub const fn pid(&self) -> Option<Pid> {
        self.request.pid
    }

    /// Returns the decision channel path.
    #[must_use]
    pub fn channel_path(&self) -> &Path {
        self.channel.path()
    }

    /// Commits a decision lasting `duration_minutes`.
    ///
    /// Positive durations become an absolute deadline, `0` answers once, and
    /// negative values skip persistence. Write and store failures are logged
    /// and reported in the receipt.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Unexpected`] when the blocking task fails.
    pub async fn respond(
        self,
        action: PolicyAction,
        duration_minutes: i32,
    ) -> Result<DecisionReceipt, BrokerError> {
        let Self {
            request,
            identity,
            channel,
            commit,
        } = self;
        spawn_blocking(move || commit.commit(&request, &identity, channel, action, duration_minutes))
            .await
            .map_err(|err| BrokerError::Unexpected(format!("decision task failed: {err}")))
    }

    /// Closes the channel without writing a decision.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Unexpected`] when the blocking task fails.
    pub async fn abandon(self) -> Result<(), BrokerError> {
        let Self {
            request,
            mut channel,
            commit,
            ..
        } = self;
        spawn_blocking(move || release_channel(&mut channel, commit.audit.as_ref(), &request))
            .await
            .map_err(|err| BrokerError::Unexpected(format!("abandon task failed: {err}")))
    }
}

// ============================================================================
// SECTION: Decision Commit
// ============================================================================

/// Collaborators shared by every decision commit.
#[derive(Clone)]
struct CommitContext {
    /// Policy store.
    store: Arc<dyn PolicyStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn BrokerAuditSink>,
}

impl CommitContext {
    /// Writes, closes, then persists. Runs on a blocking worker.
    fn commit(
        &self,
        request: &ValidatedRequest,
        identity: &Identity,
        mut channel: DecisionChannel,
        action: PolicyAction,
        duration_minutes: i32,
    ) -> DecisionReceipt {
        let until = Policy::until_for(self.clock.now_unix_seconds(), duration_minutes);
        let policy = Policy {
            uid: request.uid,
            action,
            until,
        };
        let event = |kind| {
            caller_event(kind, request).with_subject(identity.label()).with_decision(action, until)
        };

        let delivered = match channel.send(action) {
            Ok(()) => {
                self.audit.record(&event(BrokerEventKind::DecisionDelivered));
                true
            }
            Err(err) => {
                self.audit
                    .record(&event(BrokerEventKind::DeliveryFailed).with_reason(err.to_string()));
                false
            }
        };
        release_channel(&mut channel, self.audit.as_ref(), request);

        let persisted = policy.is_persistent()
            && match self.store.update(&policy) {
                Ok(()) => {
                    self.audit.record(&event(BrokerEventKind::PolicyPersisted));
                    true
                }
                Err(err) => {
                    self.audit.record(
                        &event(BrokerEventKind::PolicyPersistFailed).with_reason(err.to_string()),
                    );
                    false
                }
            };

        DecisionReceipt {
            policy,
            delivered,
            persisted,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Caller state produced by [`initialize`].
struct Initialized {
    /// Resolved caller identity.
    identity: Identity,
    /// Open decision channel.
    channel: DecisionChannel,
    /// True when the caller is, or shares a uid with, the broker's package.
    is_self: bool,
}

/// Resolves the caller, checks it against the broker's own package, and
/// opens its channel. Runs on a blocking worker.
fn initialize(
    resolver: &IdentityResolver,
    opener: &dyn ChannelOpener,
    request: &ValidatedRequest,
    self_package: &PackageName,
) -> Result<Initialized, InitFailure> {
    let identity = resolver.resolve(request.uid, request.pid).map_err(init_failure)?;
    let is_self = identity.package_name() == Some(self_package)
        || resolver.uid_owns_package(request.uid, self_package).map_err(init_failure)?;
    let channel = DecisionChannel::open(opener, &request.channel_path).map_err(|err| {
        InitFailure::Recoverable(RequestFailure::ChannelOpen(format!(
            "{}: {err}",
            request.channel_path.display()
        )))
    })?;
    Ok(Initialized {
        identity,
        channel,
        is_self,
    })
}

/// Splits resolver errors into per-request and unexpected failures.
fn init_failure(err: ResolveError) -> InitFailure {
    if err.is_recoverable() {
        InitFailure::Recoverable(RequestFailure::Identity(err))
    } else {
        InitFailure::Unexpected(err.to_string())
    }
}

/// Closes a channel, logging (not raising) close failures.
fn release_channel(
    channel: &mut DecisionChannel,
    audit: &dyn BrokerAuditSink,
    request: &ValidatedRequest,
) {
    if let Err(err) = channel.close() {
        audit.record(
            &caller_event(BrokerEventKind::ChannelCloseFailed, request).with_reason(err.to_string()),
        );
    }
}

/// Creates an audit event tagged with the caller's uid and pid.
fn caller_event(kind: BrokerEventKind, request: &ValidatedRequest) -> BrokerAuditEvent {
    BrokerAuditEvent::new(kind).with_caller(request.uid, request.pid)
}
