// crates/root-gate-broker/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fakes for root-gate-broker tests.
// Purpose: Provide fault-injectable channels, stores, runners, and audit sinks.
// Dependencies: root-gate-broker, root-gate-core
// ============================================================================

//! ## Overview
//! Fakes that record every interaction so tests can assert on channel opens,
//! bytes written, close counts, store writes, and emitted audit events.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Each test binary uses a different subset of the fakes.")]

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use root_gate_broker::BrokerAuditEvent;
use root_gate_broker::BrokerAuditSink;
use root_gate_broker::BrokerConfig;
use root_gate_broker::BrokerEventKind;
use root_gate_broker::RequestBroker;
use root_gate_core::AutoResponse;
use root_gate_core::ChannelOpener;
use root_gate_core::ChannelTransport;
use root_gate_core::CommandRunner;
use root_gate_core::FixedClock;
use root_gate_core::InMemoryPolicyStore;
use root_gate_core::PackageName;
use root_gate_core::PackageRecord;
use root_gate_core::Policy;
use root_gate_core::PolicyStore;
use root_gate_core::StaticPackageMetadata;
use root_gate_core::StoreError;
use root_gate_core::Uid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed clock reading used by broker tests.
pub const NOW: i64 = 1_700_000_000;
/// Package name of the broker itself.
pub const SELF_PACKAGE: &str = "io.rootgate.manager";
/// Uid of the broker's own package.
pub const SELF_UID: u32 = 10_010;
/// Uid of an ordinary terminal app.
pub const TERMINAL_UID: u32 = 10_123;
/// Uid of a second ordinary app.
pub const BACKUP_UID: u32 = 10_456;

// ============================================================================
// SECTION: Channel Fakes
// ============================================================================

/// Shared record of everything done to the channels an opener produced.
#[derive(Default)]
pub struct ChannelLog {
    /// Paths passed to `open`.
    pub opened: Mutex<Vec<PathBuf>>,
    /// Bytes written across all transports.
    pub written: Mutex<Vec<u8>>,
    /// Number of transport closes.
    pub closes: AtomicUsize,
}

impl ChannelLog {
    /// Number of `open` calls.
    pub fn opens(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    /// Bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    /// Number of transport closes so far.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Transport that records into a [`ChannelLog`] and can inject faults.
pub struct FakeTransport {
    /// Shared record.
    log: Arc<ChannelLog>,
    /// Fail every write.
    fail_write: bool,
    /// Fail the close.
    fail_close: bool,
}

impl ChannelTransport for FakeTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"));
        }
        self.log.written.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }
}

/// Opener producing [`FakeTransport`] values.
#[derive(Default)]
pub struct FakeOpener {
    /// Shared record.
    pub log: Arc<ChannelLog>,
    /// Fail every open.
    pub fail_open: bool,
    /// Hand out transports whose writes fail.
    pub fail_write: bool,
    /// Hand out transports whose close fails.
    pub fail_close: bool,
}

impl ChannelOpener for FakeOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn ChannelTransport>> {
        self.log.opened.lock().unwrap().push(path.to_path_buf());
        if self.fail_open {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such pipe"));
        }
        Ok(Box::new(FakeTransport {
            log: Arc::clone(&self.log),
            fail_write: self.fail_write,
            fail_close: self.fail_close,
        }))
    }
}

// ============================================================================
// SECTION: Store Fake
// ============================================================================

/// Policy store that records every update and can refuse writes.
#[derive(Default)]
pub struct RecordingStore {
    /// Backing store.
    pub inner: InMemoryPolicyStore,
    /// Every policy passed to `update`.
    pub updates: Mutex<Vec<Policy>>,
    /// Refuse every update.
    pub fail_update: bool,
}

impl RecordingStore {
    /// Policies passed to `update` so far.
    pub fn updates(&self) -> Vec<Policy> {
        self.updates.lock().unwrap().clone()
    }
}

impl PolicyStore for RecordingStore {
    fn get(&self, uid: Uid) -> Result<Option<Policy>, StoreError> {
        self.inner.get(uid)
    }

    fn update(&self, policy: &Policy) -> Result<(), StoreError> {
        self.updates.lock().unwrap().push(*policy);
        if self.fail_update {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.update(policy)
    }

    fn delete(&self, uid: Uid) -> Result<bool, StoreError> {
        self.inner.delete(uid)
    }

    fn list(&self) -> Result<Vec<Policy>, StoreError> {
        self.inner.list()
    }

    fn prune_expired(&self, now_seconds: i64) -> Result<usize, StoreError> {
        self.inner.prune_expired(now_seconds)
    }
}

// ============================================================================
// SECTION: Command and Audit Fakes
// ============================================================================

/// Command runner that records commands instead of running them.
#[derive(Default)]
pub struct RecordingCommands {
    /// Recorded command lines.
    pub commands: Mutex<Vec<String>>,
}

impl RecordingCommands {
    /// Commands recorded so far.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingCommands {
    fn spawn_detached(&self, command: &str) {
        self.commands.lock().unwrap().push(command.to_string());
    }
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryAudit {
    /// Recorded events.
    pub events: Mutex<Vec<BrokerAuditEvent>>,
}

impl MemoryAudit {
    /// Kinds of the recorded events, in order.
    pub fn kinds(&self) -> Vec<BrokerEventKind> {
        self.events.lock().unwrap().iter().map(|event| event.kind).collect()
    }
}

impl BrokerAuditSink for MemoryAudit {
    fn record(&self, event: &BrokerAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Creates a package record without shared user data.
pub fn record(uid: u32, name: &str) -> PackageRecord {
    PackageRecord {
        uid: Uid::new(uid),
        package_name: PackageName::new(name),
        shared_user_id: None,
        version_name: None,
    }
}

/// Package table holding the broker itself and two ordinary apps.
pub fn package_table() -> StaticPackageMetadata {
    StaticPackageMetadata::new([
        record(SELF_UID, SELF_PACKAGE),
        record(TERMINAL_UID, "com.example.terminal"),
        record(BACKUP_UID, "com.example.backup"),
    ])
}

/// Package table where the broker shares its uid with a helper package.
pub fn shared_self_table() -> StaticPackageMetadata {
    let shared = |name: &str| PackageRecord {
        shared_user_id: Some("io.rootgate.shared".to_string()),
        ..record(SELF_UID, name)
    };
    StaticPackageMetadata::new([
        shared(SELF_PACKAGE),
        shared("io.rootgate.helper"),
        record(TERMINAL_UID, "com.example.terminal"),
    ])
}

/// All collaborators of a broker under test.
pub struct Harness {
    /// Broker under test.
    pub broker: RequestBroker,
    /// Channel record.
    pub channels: Arc<ChannelLog>,
    /// Policy store.
    pub store: Arc<RecordingStore>,
    /// Command runner.
    pub commands: Arc<RecordingCommands>,
    /// Audit sink.
    pub audit: Arc<MemoryAudit>,
}

/// Builds a broker around the given opener and store.
pub fn harness_with(
    auto_response: AutoResponse,
    opener: FakeOpener,
    store: RecordingStore,
) -> Harness {
    harness_over(auto_response, package_table(), opener, store)
}

/// Builds a broker over an explicit package table.
pub fn harness_over(
    auto_response: AutoResponse,
    packages: StaticPackageMetadata,
    opener: FakeOpener,
    store: RecordingStore,
) -> Harness {
    let channels = Arc::clone(&opener.log);
    let store = Arc::new(store);
    let commands = Arc::new(RecordingCommands::default());
    let audit = Arc::new(MemoryAudit::default());
    let broker = RequestBroker::builder(BrokerConfig {
        self_package: PackageName::new(SELF_PACKAGE),
        auto_response,
    })
    .metadata(Arc::new(packages))
    .store(store.clone())
    .opener(Arc::new(opener))
    .commands(commands.clone())
    .clock(Arc::new(FixedClock(NOW)))
    .audit(audit.clone())
    .build()
    .unwrap();
    Harness {
        broker,
        channels,
        store,
        commands,
        audit,
    }
}

/// Builds a broker with well-behaved fakes.
pub fn harness(auto_response: AutoResponse) -> Harness {
    harness_with(auto_response, FakeOpener::default(), RecordingStore::default())
}
