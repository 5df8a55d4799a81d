// crates/root-gate-cli/src/messages.rs
// ============================================================================
// Module: CLI Message Table
// Description: Keyed English templates for every user-facing CLI string.
// Purpose: Keep operator-visible wording in one reviewable table.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! Every line the `root-gate` binary prints goes through the [`t!`](crate::t)
//! macro, which looks a dotted key up in [`MESSAGES`] and fills `{name}`
//! placeholders from named arguments.
//!
//! ## Invariants
//! - Keys are unique and grouped by command (`request.*`, `policy.*`, ...).
//! - An unknown key renders as the key itself, never as an empty line.
//! - Placeholders without a matching argument are left verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Table
// ============================================================================

/// Message templates keyed by dotted message id.
pub const MESSAGES: &[(&str, &str)] = &[
    ("main.version", "root-gate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to serialize output: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("store.open_failed", "Failed to open policy store: {error}"),
    (
        "store.memory_unsupported",
        "The configured policy store is in-memory; pass --store-path or configure \
         store.type = \"sqlite\".",
    ),
    ("audit.open_failed", "Failed to open audit log {path}: {error}"),
    ("broker.init_failed", "Failed to initialize broker: {error}"),
    ("request.failed", "Request handling failed: {error}"),
    ("request.prompt", "Grant superuser access to {subject} (uid {uid})? [y/N]"),
    ("request.prompt_failed", "Failed to read a decision from stdin: {error}"),
    ("request.outcome.rejected", "Request rejected: {reason}"),
    ("request.outcome.self_blocked", "Request from {package} blocked; uninstall requested."),
    (
        "request.outcome.decided",
        "Decision {action} for uid {uid} (until {until}, delivered {delivered}, persisted \
         {persisted}).",
    ),
    ("policy.list.failed", "Failed to list policies: {error}"),
    ("policy.list.header", "Stored policies: {count}"),
    ("policy.list.entry", "uid {uid}: {action} (until {until})"),
    ("policy.get.failed", "Failed to read policy: {error}"),
    ("policy.get.not_found", "No policy stored for uid {uid}."),
    ("policy.revoke.failed", "Failed to revoke policy: {error}"),
    ("policy.revoke.done", "Revoked policy for uid {uid}: {removed}"),
    ("policy.prune.failed", "Failed to prune policies: {error}"),
    ("policy.prune.done", "Pruned {count} expired policies."),
];

/// Returns the template for `key`, if the table has one.
#[must_use]
pub fn template(key: &str) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| MESSAGES.iter().copied().collect()).get(key).copied()
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// A named value substituted into a template by the [`macro@crate::t`] macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    /// Placeholder name without braces (for example, `uid`).
    pub key: &'static str,
    /// Display text substituted for the placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`].
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Renders `key` with `args` substituted, falling back to the key itself.
#[must_use]
pub fn render(key: &str, args: Vec<MessageArg>) -> String {
    let mut message = template(key).unwrap_or(key).to_string();
    for arg in args {
        message = message.replace(&format!("{{{}}}", arg.key), &arg.value);
    }
    message
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Renders a message from the table with named placeholder arguments.
///
/// ```
/// let line = root_gate_cli::t!("policy.get.not_found", uid = 10_123);
/// assert_eq!(line, "No policy stored for uid 10123.");
/// ```
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::messages::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::messages::render($key, args)
    }};
}
