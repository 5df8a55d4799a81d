// crates/root-gate-broker/src/command.rs
// ============================================================================
// Module: Root Gate Remediation Commands
// Description: Fire-and-forget shell execution for anti-impersonation remediation.
// Purpose: Uninstall a package that impersonates the broker.
// Dependencies: root-gate-core, std
// ============================================================================

//! ## Overview
//! The anti-impersonation guard asks the system to uninstall the offending
//! package. The command runs detached through `sh -c`; its output is
//! discarded and its exit status is never inspected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Command;
use std::process::Stdio;

use root_gate_core::CommandRunner;
use root_gate_core::PackageName;

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Shell used for detached commands.
const SHELL: &str = "sh";

/// Builds the background uninstall command for `package`.
///
/// Returns `None` when the name is not a well-formed package name, so a
/// hostile label can never reach the shell.
#[must_use]
pub fn uninstall_command(package: &PackageName) -> Option<String> {
    package
        .is_well_formed()
        .then(|| format!("(pm uninstall {} >/dev/null 2>&1)&", package.as_str()))
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// [`CommandRunner`] that spawns `sh -c <command>` with null stdio.
///
/// The shell is waited on inline, so callers must run it off the async
/// executor. Commands that background their work return immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandRunner;

impl CommandRunner for ShellCommandRunner {
    fn spawn_detached(&self, command: &str) {
        let spawned = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Ok(mut child) = spawned {
            let _ = child.wait();
        }
    }
}
