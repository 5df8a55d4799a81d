// crates/root-gate-core/src/core/time.rs
// ============================================================================
// Module: Root Gate Time Source
// Description: Injectable wall-clock used to compute policy expiry.
// Purpose: Keep expiry arithmetic deterministic under test.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The broker never reads wall-clock time directly; hosts inject a [`Clock`].
//! [`SystemClock`] is used in production and [`FixedClock`] in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time in unix epoch seconds.
pub trait Clock: Send + Sync {
    /// Returns the current unix time in seconds.
    fn now_unix_seconds(&self) -> i64;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_seconds(&self) -> i64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        i64::try_from(now.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Clock that always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix_seconds(&self) -> i64 {
        self.0
    }
}
