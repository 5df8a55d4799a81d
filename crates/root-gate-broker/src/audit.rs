// crates/root-gate-broker/src/audit.rs
// ============================================================================
// Module: Root Gate Broker Audit Logging
// Description: Structured audit events for superuser request handling.
// Purpose: Emit JSON-line audit records without hard logging dependencies.
// Dependencies: root-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every decision point in the broker emits a [`BrokerAuditEvent`] through a
//! [`BrokerAuditSink`]. Sinks serialize events as one JSON object per line and
//! never fail the request they describe: a sink that cannot write drops the
//! record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use root_gate_core::Pid;
use root_gate_core::PolicyAction;
use root_gate_core::Uid;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Broker decision point being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerEventKind {
    /// Request descriptor, identity, or channel failed; request dropped.
    RequestRejected,
    /// The broker's own package asked for root; uninstall triggered.
    SelfRequestBlocked,
    /// Decision delivered without user interaction.
    AutoResponded,
    /// Request handed to the decision surface.
    InteractiveRequired,
    /// Decision code written to the requester's pipe.
    DecisionDelivered,
    /// Decision code could not be written.
    DeliveryFailed,
    /// Closing the pipe failed.
    ChannelCloseFailed,
    /// Policy row written to the store.
    PolicyPersisted,
    /// Policy row could not be written.
    PolicyPersistFailed,
}

/// Broker audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Decision point.
    pub kind: BrokerEventKind,
    /// Requesting uid when known.
    pub uid: Option<Uid>,
    /// Requesting pid when known.
    pub pid: Option<Pid>,
    /// Resolved identity label when known.
    pub subject: Option<String>,
    /// Decision action when one applies.
    pub action: Option<PolicyAction>,
    /// Raw expiry value when a decision applies.
    pub until: Option<i64>,
    /// Failure or rejection reason.
    pub reason: Option<String>,
}

impl BrokerAuditEvent {
    /// Creates an event with a consistent timestamp and no details.
    #[must_use]
    pub fn new(kind: BrokerEventKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "su_request",
            timestamp_ms,
            kind,
            uid: None,
            pid: None,
            subject: None,
            action: None,
            until: None,
            reason: None,
        }
    }

    /// Sets the requester uid and pid.
    #[must_use]
    pub const fn with_caller(mut self, uid: Uid, pid: Option<Pid>) -> Self {
        self.uid = Some(uid);
        self.pid = pid;
        self
    }

    /// Sets the resolved identity label.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the decision action and raw expiry.
    #[must_use]
    pub const fn with_decision(mut self, action: PolicyAction, until: i64) -> Self {
        self.action = Some(action);
        self.until = Some(until);
        self
    }

    /// Sets the failure reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for broker events.
pub trait BrokerAuditSink: Send + Sync {
    /// Records a broker audit event.
    fn record(&self, event: &BrokerAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl BrokerAuditSink for StderrAuditSink {
    fn record(&self, event: &BrokerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl BrokerAuditSink for FileAuditSink {
    fn record(&self, event: &BrokerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl BrokerAuditSink for NoopAuditSink {
    fn record(&self, _event: &BrokerAuditEvent) {}
}
