// crates/root-gate-broker/tests/broker.rs
// ============================================================================
// Module: Request Broker Tests
// Description: End-to-end broker behavior against recording fakes.
// Purpose: Pin fail-closed initialization, the self guard, and decision commits.
// Dependencies: root-gate-broker, root-gate-core, tokio
// ============================================================================

//! ## Overview
//! Drives [`RequestBroker`] through every start outcome and through
//! [`PendingRequest::respond`], including injected channel and store faults.

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

mod common;

use std::path::Path;
use std::sync::Arc;

use common::BACKUP_UID;
use common::FakeOpener;
use common::NOW;
use common::RecordingStore;
use common::SELF_PACKAGE;
use common::SELF_UID;
use common::TERMINAL_UID;
use common::harness;
use common::harness_over;
use common::harness_with;
use root_gate_broker::BrokerConfig;
use root_gate_broker::BrokerError;
use root_gate_broker::BrokerEventKind;
use root_gate_broker::PendingRequest;
use root_gate_broker::RequestBroker;
use root_gate_broker::RequestFailure;
use root_gate_broker::StartOutcome;
use root_gate_core::AutoResponse;
use root_gate_core::FixedClock;
use root_gate_core::InMemoryPolicyStore;
use root_gate_core::MetadataError;
use root_gate_core::PackageMetadata;
use root_gate_core::PackageName;
use root_gate_core::PackageRecord;
use root_gate_core::Pid;
use root_gate_core::Policy;
use root_gate_core::PolicyAction;
use root_gate_core::PolicyStore;
use root_gate_core::RequestDescriptor;
use root_gate_core::RequestRejection;
use root_gate_core::ResolveError;
use root_gate_core::Uid;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const ALL_MODES: [AutoResponse; 3] = [AutoResponse::Prompt, AutoResponse::Deny, AutoResponse::Allow];

fn descriptor(uid: i32) -> RequestDescriptor {
    RequestDescriptor::new(Some(format!("/dev/socket/su_{uid}")), uid, 4242)
}

fn uid(raw: u32) -> i32 {
    i32::try_from(raw).unwrap()
}

fn interactive(outcome: StartOutcome) -> PendingRequest {
    match outcome {
        StartOutcome::Interactive(pending) => pending,
        other => panic!("expected interactive outcome, got {other:?}"),
    }
}

/// Metadata service whose lookups always hit an internal fault.
struct BrokenMetadata;

impl PackageMetadata for BrokenMetadata {
    fn lookup(&self, _uid: Uid, _pid: Option<Pid>) -> Result<Option<PackageRecord>, MetadataError> {
        Err(MetadataError::Internal("binder transaction corrupted".to_string()))
    }

    fn name_for_uid(&self, _uid: Uid) -> Result<Option<String>, MetadataError> {
        Ok(None)
    }

    fn packages_for_uid(&self, _uid: Uid) -> Result<Vec<PackageName>, MetadataError> {
        Err(MetadataError::Internal("binder transaction corrupted".to_string()))
    }
}

// ============================================================================
// SECTION: Descriptor Validation
// ============================================================================

#[tokio::test]
async fn malformed_descriptors_never_open_a_channel() {
    let malformed = [
        RequestDescriptor::new(None, uid(TERMINAL_UID), 1),
        RequestDescriptor::new(Some("/dev/socket/su".to_string()), -1, 1),
        RequestDescriptor::new(Some(String::new()), uid(TERMINAL_UID), 1),
    ];
    for mode in ALL_MODES {
        let h = harness(mode);
        for descriptor in &malformed {
            let outcome = h.broker.start(descriptor).await.unwrap();
            assert!(!outcome.requires_interaction());
            assert!(matches!(outcome, StartOutcome::Rejected(RequestFailure::Rejected(_))));
        }
        assert_eq!(h.channels.opens(), 0);
        assert!(h.store.updates().is_empty());
        assert_eq!(h.audit.kinds(), vec![BrokerEventKind::RequestRejected; 3]);
    }
}

#[tokio::test]
async fn missing_uid_is_reported_verbatim() {
    let h = harness(AutoResponse::Prompt);
    let outcome = h.broker.start(&RequestDescriptor::new(Some("/p".into()), -7, -1)).await.unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Rejected(RequestFailure::Rejected(RequestRejection::InvalidUid(-7)))
    ));
}

// ============================================================================
// SECTION: Initialization Failures
// ============================================================================

#[tokio::test]
async fn unknown_identity_fails_closed_before_opening() {
    let h = harness(AutoResponse::Allow);
    let outcome = h.broker.start(&descriptor(99_999)).await.unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Rejected(RequestFailure::Identity(ResolveError::NotFound(_)))
    ));
    assert_eq!(h.channels.opens(), 0);
    assert!(h.store.updates().is_empty());
}

#[tokio::test]
async fn channel_open_failure_fails_closed() {
    let opener = FakeOpener {
        fail_open: true,
        ..FakeOpener::default()
    };
    let h = harness_with(AutoResponse::Allow, opener, RecordingStore::default());
    let outcome = h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap();

    assert!(matches!(outcome, StartOutcome::Rejected(RequestFailure::ChannelOpen(_))));
    assert_eq!(h.channels.opens(), 1);
    assert_eq!(h.channels.closes(), 0);
    assert!(h.store.updates().is_empty());
    assert_eq!(h.audit.kinds(), vec![BrokerEventKind::RequestRejected]);
}

#[tokio::test]
async fn internal_lookup_fault_propagates() {
    let broker = RequestBroker::builder(BrokerConfig {
        self_package: PackageName::new(SELF_PACKAGE),
        auto_response: AutoResponse::Deny,
    })
    .metadata(Arc::new(BrokenMetadata))
    .store(Arc::new(InMemoryPolicyStore::new()))
    .opener(Arc::new(FakeOpener::default()))
    .build()
    .unwrap();

    let err = broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap_err();
    assert!(matches!(err, BrokerError::Unexpected(_)));
}

#[test]
fn builder_requires_metadata_and_store() {
    let config = BrokerConfig {
        self_package: PackageName::new(SELF_PACKAGE),
        auto_response: AutoResponse::Prompt,
    };
    let missing_metadata = RequestBroker::builder(config.clone()).build();
    assert!(matches!(missing_metadata, Err(BrokerError::MissingCollaborator("metadata"))));

    let missing_store =
        RequestBroker::builder(config).metadata(Arc::new(common::package_table())).build();
    assert!(matches!(missing_store, Err(BrokerError::MissingCollaborator("store"))));
}

// ============================================================================
// SECTION: Anti-Impersonation Guard
// ============================================================================

#[tokio::test]
async fn self_requests_are_blocked_in_every_mode() {
    for mode in ALL_MODES {
        let h = harness(mode);
        let outcome = h.broker.start(&descriptor(uid(SELF_UID))).await.unwrap();

        assert!(!outcome.requires_interaction());
        match outcome {
            StartOutcome::SelfRequestBlocked {
                package,
            } => assert_eq!(package.as_str(), SELF_PACKAGE),
            other => panic!("expected self block, got {other:?}"),
        }
        assert!(h.channels.written().is_empty());
        assert_eq!(h.channels.closes(), 1);
        assert!(h.store.updates().is_empty());
        assert_eq!(
            h.commands.commands(),
            vec![format!("(pm uninstall {SELF_PACKAGE} >/dev/null 2>&1)&")]
        );
        assert_eq!(h.audit.kinds(), vec![BrokerEventKind::SelfRequestBlocked]);
    }
}

#[tokio::test]
async fn shared_uid_holding_own_package_is_blocked_in_every_mode() {
    for mode in ALL_MODES {
        let h = harness_over(
            mode,
            common::shared_self_table(),
            FakeOpener::default(),
            RecordingStore::default(),
        );
        let outcome = h.broker.start(&descriptor(uid(SELF_UID))).await.unwrap();

        assert!(!outcome.requires_interaction());
        match outcome {
            StartOutcome::SelfRequestBlocked {
                package,
            } => assert_eq!(package.as_str(), SELF_PACKAGE),
            other => panic!("expected self block for {mode:?}, got {other:?}"),
        }
        assert_eq!(h.channels.opens(), 1);
        assert!(h.channels.written().is_empty());
        assert_eq!(h.channels.closes(), 1);
        assert!(h.store.updates().is_empty());
        assert_eq!(
            h.commands.commands(),
            vec![format!("(pm uninstall {SELF_PACKAGE} >/dev/null 2>&1)&")]
        );
        assert_eq!(h.audit.kinds(), vec![BrokerEventKind::SelfRequestBlocked]);
    }
}

#[tokio::test]
async fn ordinary_caller_beside_shared_self_uid_is_unaffected() {
    let h = harness_over(
        AutoResponse::Allow,
        common::shared_self_table(),
        FakeOpener::default(),
        RecordingStore::default(),
    );
    let outcome = h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap();

    assert!(matches!(outcome, StartOutcome::AutoResponded(_)));
    assert_eq!(h.channels.written(), PolicyAction::Allow.code().to_be_bytes().to_vec());
    assert!(h.commands.commands().is_empty());
}

#[tokio::test]
async fn ownership_lookup_fault_propagates() {
    struct OwnershipFault;

    impl PackageMetadata for OwnershipFault {
        fn lookup(&self, uid: Uid, _pid: Option<Pid>) -> Result<Option<PackageRecord>, MetadataError> {
            Ok(Some(common::record(uid.get(), "com.example.terminal")))
        }

        fn name_for_uid(&self, _uid: Uid) -> Result<Option<String>, MetadataError> {
            Ok(None)
        }

        fn packages_for_uid(&self, _uid: Uid) -> Result<Vec<PackageName>, MetadataError> {
            Err(MetadataError::Internal("package list unavailable".to_string()))
        }
    }

    let opener = FakeOpener::default();
    let channels = Arc::clone(&opener.log);
    let broker = RequestBroker::builder(BrokerConfig {
        self_package: PackageName::new(SELF_PACKAGE),
        auto_response: AutoResponse::Allow,
    })
    .metadata(Arc::new(OwnershipFault))
    .store(Arc::new(InMemoryPolicyStore::new()))
    .opener(Arc::new(opener))
    .build()
    .unwrap();

    let err = broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap_err();
    assert!(matches!(err, BrokerError::Unexpected(_)));
    assert_eq!(channels.opens(), 0);
}

// ============================================================================
// SECTION: Auto-Response
// ============================================================================

#[tokio::test]
async fn auto_responses_write_once_and_record_one_shot() {
    for (mode, action) in [(AutoResponse::Allow, PolicyAction::Allow), (AutoResponse::Deny, PolicyAction::Deny)] {
        let h = harness(mode);
        let outcome = h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap();

        assert!(!outcome.requires_interaction());
        let StartOutcome::AutoResponded(receipt) = outcome else {
            panic!("expected auto response");
        };
        assert!(receipt.delivered);
        assert!(receipt.persisted);
        assert_eq!(h.channels.written(), action.code().to_be_bytes().to_vec());
        assert_eq!(h.channels.closes(), 1);

        let updates = h.store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].until, 0);
        assert!(!updates[0].is_standing(NOW));
        assert!(h.audit.kinds().contains(&BrokerEventKind::AutoResponded));
        assert!(h.commands.commands().is_empty());
    }
}

#[tokio::test]
async fn prompt_mode_defers_without_writing() {
    let h = harness(AutoResponse::Prompt);
    let outcome = h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap();
    assert!(outcome.requires_interaction());

    let pending = interactive(outcome);
    assert_eq!(pending.uid(), Uid::new(TERMINAL_UID));
    assert_eq!(pending.pid(), Some(Pid::new(4242)));
    assert_eq!(pending.identity().label(), "com.example.terminal");
    assert_eq!(pending.channel_path(), Path::new(&format!("/dev/socket/su_{TERMINAL_UID}")));
    assert!(h.channels.written().is_empty());
    assert_eq!(h.channels.closes(), 0);
    assert_eq!(h.audit.kinds(), vec![BrokerEventKind::InteractiveRequired]);
}

// ============================================================================
// SECTION: Decision Commit
// ============================================================================

#[tokio::test]
async fn timed_allow_persists_absolute_deadline() {
    let h = harness(AutoResponse::Prompt);
    let pending = interactive(h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap());
    let receipt = pending.respond(PolicyAction::Allow, 30).await.unwrap();

    let expected = Policy {
        uid: Uid::new(TERMINAL_UID),
        action: PolicyAction::Allow,
        until: NOW + 1800,
    };
    assert_eq!(receipt.policy, expected);
    assert!(receipt.delivered && receipt.persisted);
    assert_eq!(h.store.get(Uid::new(TERMINAL_UID)).unwrap(), Some(expected));
    assert_eq!(h.channels.written(), 2_i32.to_be_bytes().to_vec());
    assert_eq!(h.channels.closes(), 1);
}

#[tokio::test]
async fn one_shot_deny_is_still_recorded() {
    let h = harness(AutoResponse::Prompt);
    let pending = interactive(h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap());
    let receipt = pending.respond(PolicyAction::Deny, 0).await.unwrap();

    assert_eq!(receipt.policy.until, 0);
    assert!(receipt.persisted);
    assert_eq!(h.store.updates(), vec![receipt.policy]);
    assert_eq!(h.channels.written(), vec![0, 0, 0, 1]);
}

#[tokio::test]
async fn negative_duration_is_delivered_but_not_persisted() {
    let h = harness(AutoResponse::Prompt);
    let pending = interactive(h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap());
    let receipt = pending.respond(PolicyAction::Allow, -1).await.unwrap();

    assert_eq!(receipt.policy.until, -1);
    assert!(receipt.delivered);
    assert!(!receipt.persisted);
    assert!(h.store.updates().is_empty());
    assert_eq!(h.channels.closes(), 1);
}

#[tokio::test]
async fn write_failure_still_closes_once_and_persists() {
    let opener = FakeOpener {
        fail_write: true,
        ..FakeOpener::default()
    };
    let h = harness_with(AutoResponse::Prompt, opener, RecordingStore::default());
    let pending = interactive(h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap());
    let receipt = pending.respond(PolicyAction::Allow, 5).await.unwrap();

    assert!(!receipt.delivered);
    assert!(receipt.persisted);
    assert_eq!(h.channels.closes(), 1);
    assert!(h.audit.kinds().contains(&BrokerEventKind::DeliveryFailed));
}

#[tokio::test]
async fn close_and_store_failures_are_logged_not_raised() {
    let opener = FakeOpener {
        fail_close: true,
        ..FakeOpener::default()
    };
    let store = RecordingStore {
        fail_update: true,
        ..RecordingStore::default()
    };
    let h = harness_with(AutoResponse::Prompt, opener, store);
    let pending = interactive(h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap());
    let receipt = pending.respond(PolicyAction::Deny, 10).await.unwrap();

    assert!(receipt.delivered);
    assert!(!receipt.persisted);
    assert_eq!(h.channels.closes(), 1);
    assert_eq!(
        h.audit.kinds(),
        vec![
            BrokerEventKind::InteractiveRequired,
            BrokerEventKind::DecisionDelivered,
            BrokerEventKind::ChannelCloseFailed,
            BrokerEventKind::PolicyPersistFailed,
        ]
    );
}

#[tokio::test]
async fn abandoned_and_dropped_requests_close_without_data() {
    let h = harness(AutoResponse::Prompt);
    let pending = interactive(h.broker.start(&descriptor(uid(TERMINAL_UID))).await.unwrap());
    pending.abandon().await.unwrap();
    assert_eq!(h.channels.closes(), 1);

    let pending = interactive(h.broker.start(&descriptor(uid(BACKUP_UID))).await.unwrap());
    drop(pending);
    assert_eq!(h.channels.closes(), 2);
    assert!(h.channels.written().is_empty());
    assert!(h.store.updates().is_empty());
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_are_isolated() {
    let shared = Arc::new(InMemoryPolicyStore::new());
    let build = |opener: Arc<FakeOpener>| {
        RequestBroker::builder(BrokerConfig {
            self_package: PackageName::new(SELF_PACKAGE),
            auto_response: AutoResponse::Prompt,
        })
        .metadata(Arc::new(common::package_table()))
        .store(shared.clone())
        .opener(opener)
        .clock(Arc::new(FixedClock(NOW)))
        .build()
        .unwrap()
    };
    let terminal_opener = Arc::new(FakeOpener::default());
    let backup_opener = Arc::new(FakeOpener::default());
    let terminal = build(terminal_opener.clone());
    let backup = build(backup_opener.clone());

    let run = |broker: RequestBroker, raw_uid: u32, action: PolicyAction, minutes: i32| async move {
        let pending = interactive(broker.start(&descriptor(uid(raw_uid))).await.unwrap());
        pending.respond(action, minutes).await.unwrap()
    };
    let (allowed, denied) = tokio::join!(
        run(terminal, TERMINAL_UID, PolicyAction::Allow, 60),
        run(backup, BACKUP_UID, PolicyAction::Deny, 0),
    );

    assert_eq!(terminal_opener.log.written(), 2_i32.to_be_bytes().to_vec());
    assert_eq!(backup_opener.log.written(), 1_i32.to_be_bytes().to_vec());
    assert_eq!(terminal_opener.log.closes(), 1);
    assert_eq!(backup_opener.log.closes(), 1);
    assert_eq!(shared.get(Uid::new(TERMINAL_UID)).unwrap(), Some(allowed.policy));
    assert_eq!(shared.get(Uid::new(BACKUP_UID)).unwrap(), Some(denied.policy));
    assert_eq!(allowed.policy.until, NOW + 3600);
    assert_eq!(denied.policy.until, 0);
}
