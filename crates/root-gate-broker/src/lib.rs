// crates/root-gate-broker/src/lib.rs
// ============================================================================
// Module: Root Gate Broker Library
// Description: Superuser request broker, decision channel, and audit sinks.
// Purpose: Decide elevated-privilege requests and deliver the answer once.
// Dependencies: root-gate-core, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! Root Gate Broker services superuser requests: it resolves the caller's
//! identity, blocks requests from its own package, applies the configured
//! auto-response, and commits decisions through a write-once
//! [`DecisionChannel`].
//! Invariants:
//! - Exactly one 4-byte big-endian action code is written per channel, or none.
//! - Every opened channel is closed exactly once.
//! - Policies are persisted only after the channel write was attempted.
//!
//! Security posture: request descriptors, channel paths, and package metadata
//! are untrusted; expected failures fail the single request closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod broker;
pub mod channel;
pub mod command;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::BrokerAuditEvent;
pub use audit::BrokerAuditSink;
pub use audit::BrokerEventKind;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use broker::BrokerConfig;
pub use broker::BrokerError;
pub use broker::DecisionReceipt;
pub use broker::PendingRequest;
pub use broker::RequestBroker;
pub use broker::RequestBrokerBuilder;
pub use broker::RequestFailure;
pub use broker::StartOutcome;
pub use channel::ChannelError;
pub use channel::ChannelState;
pub use channel::DecisionChannel;
pub use channel::FifoOpener;
pub use channel::WriterTransport;
pub use command::ShellCommandRunner;
pub use command::uninstall_command;
