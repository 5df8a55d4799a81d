// crates/root-gate-core/src/core/policy.rs
// ============================================================================
// Module: Root Gate Policy Model
// Description: Decision actions, policy records, and auto-response modes.
// Purpose: Define the persisted decision record and its wire codes.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Policy`] associates a uid with a [`PolicyAction`] and an `until`
//! value. The raw `until` encoding is shared with the store schema:
//! - `0`: one-shot decision. It is recorded but never reused.
//! - positive: epoch seconds until which the decision may be reused.
//! - negative: the caller asked for the decision not to be persisted.
//!
//! The interactive state (code `0`) is transient and has no
//! [`PolicyAction`] variant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::Uid;

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Error returned for action codes outside the deny/allow set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown policy action code: {0}")]
pub struct UnknownActionCode(pub i32);

/// Decision sent to the requester and stored in the policy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// Refuse superuser access.
    Deny,
    /// Grant superuser access.
    Allow,
}

impl PolicyAction {
    /// Wire code for the undetermined state; never stored.
    pub const INTERACTIVE_CODE: i32 = 0;

    /// Returns the wire code written to the decision channel.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Deny => 1,
            Self::Allow => 2,
        }
    }

    /// Parses a wire code back into an action.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownActionCode`] for the interactive code and any other value.
    pub const fn from_code(code: i32) -> Result<Self, UnknownActionCode> {
        match code {
            1 => Ok(Self::Deny),
            2 => Ok(Self::Allow),
            other => Err(UnknownActionCode(other)),
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Allow => "allow",
        }
    }
}

// ============================================================================
// SECTION: Policy Records
// ============================================================================

/// Decision record for a subject uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Subject uid.
    pub uid: Uid,
    /// Decided action.
    pub action: PolicyAction,
    /// Raw validity value (see module docs).
    pub until: i64,
}

impl Policy {
    /// Computes the raw `until` value for a decision lasting `duration_minutes`.
    ///
    /// Positive durations become an absolute epoch-seconds deadline; zero and
    /// negative durations pass through unchanged.
    #[must_use]
    pub fn until_for(now_seconds: i64, duration_minutes: i32) -> i64 {
        let minutes = i64::from(duration_minutes);
        if minutes > 0 { now_seconds.saturating_add(minutes * 60) } else { minutes }
    }

    /// Returns true when the record should be written to the store.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.until >= 0
    }

    /// Returns true for one-shot decisions.
    #[must_use]
    pub const fn is_one_shot(&self) -> bool {
        self.until == 0
    }

    /// Returns true when the decision may be reused at `now_seconds`.
    #[must_use]
    pub const fn is_standing(&self, now_seconds: i64) -> bool {
        self.until > 0 && self.until > now_seconds
    }
}

// ============================================================================
// SECTION: Auto Response
// ============================================================================

/// Standing auto-response configuration consulted before prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoResponse {
    /// Defer to interactive arbitration.
    #[default]
    Prompt,
    /// Always deny without prompting.
    Deny,
    /// Always allow without prompting.
    Allow,
}
