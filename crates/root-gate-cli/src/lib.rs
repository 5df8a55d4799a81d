// crates/root-gate-cli/src/lib.rs
// ============================================================================
// Module: Root Gate CLI Library
// Description: Shared helpers for the Root Gate command-line binary.
// Purpose: Expose the message table to the binary and its tests.
// Dependencies: Standard library only.
// ============================================================================

//! ## Overview
//! Library half of the `root-gate` binary. It currently hosts the message
//! table and the [`t!`] macro used for every user-facing string.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod messages;
