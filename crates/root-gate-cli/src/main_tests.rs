// crates/root-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for prompt parsing and rendering.
// Purpose: Ensure interactive answers fail closed and output stays stable.
// Dependencies: root-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Validates helper functions in the CLI entry point.
//!
//! Security posture: a terminal answer that is not an explicit grant denies.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use root_gate_broker::DecisionReceipt;
use root_gate_core::Policy;
use root_gate_core::PolicyAction;
use root_gate_core::Uid;

use super::PolicyListOutput;
use super::RequestOutcomeLabel;
use super::RequestOutput;
use super::parse_prompt_answer;
use super::render_policy_list_text;
use super::render_request_text;

// ============================================================================
// SECTION: Prompt Answers
// ============================================================================

#[test]
fn explicit_grants_allow() {
    for answer in ["allow", "y", "YES\n", "  Y  "] {
        assert_eq!(parse_prompt_answer(answer), PolicyAction::Allow, "answer {answer}");
    }
}

#[test]
fn anything_else_denies() {
    for answer in ["", "\n", "n", "no", "deny", "allowed", "yes please", "1", "si"] {
        assert_eq!(parse_prompt_answer(answer), PolicyAction::Deny, "answer {answer}");
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

#[test]
fn decided_output_serializes_policy() {
    let receipt = DecisionReceipt {
        policy: Policy {
            uid: Uid::new(10_123),
            action: PolicyAction::Allow,
            until: 1_700_001_800,
        },
        delivered: true,
        persisted: true,
    };
    let output = RequestOutput::decided(
        RequestOutcomeLabel::Decided,
        Some("com.example.terminal".to_string()),
        receipt,
    );
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["outcome"], "decided");
    assert_eq!(json["policy"]["action"], "allow");
    assert_eq!(json["policy"]["until"], 1_700_001_800);
    assert_eq!(json["delivered"], true);

    let text = render_request_text(&output);
    assert!(text.contains("allow"));
    assert!(text.contains("10123"));
}

#[test]
fn rejected_output_carries_reason() {
    let output = RequestOutput {
        outcome: RequestOutcomeLabel::Rejected,
        subject: None,
        policy: None,
        delivered: false,
        persisted: false,
        reason: Some("invalid uid".to_string()),
    };
    assert!(render_request_text(&output).contains("invalid uid"));
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["outcome"], "rejected");
    assert!(json["policy"].is_null());
}

#[test]
fn policy_list_text_lists_each_entry() {
    let output = PolicyListOutput {
        policies: vec![
            Policy {
                uid: Uid::new(10_100),
                action: PolicyAction::Deny,
                until: 0,
            },
            Policy {
                uid: Uid::new(10_200),
                action: PolicyAction::Allow,
                until: 42,
            },
        ],
    };
    let text = render_policy_list_text(&output);
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("uid 10100: deny"));
    assert!(text.contains("uid 10200: allow"));
}
