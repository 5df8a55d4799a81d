// crates/root-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Root Gate Identifiers
// Description: Typed identifiers for requesting processes and packages.
// Purpose: Keep raw integers from untrusted descriptors out of broker logic.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Requests arrive with signed integers where `-1` means "absent". These
//! newtypes are only constructed from validated values, so anything holding a
//! [`Uid`] or [`Pid`] has already passed the sign check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted length of a package name.
const MAX_PACKAGE_NAME_LENGTH: usize = 255;

// ============================================================================
// SECTION: Process Identifiers
// ============================================================================

/// Numeric user identifier of a requesting process.
///
/// # Invariants
/// - Always non-negative; negative raw values never produce a `Uid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(u32);

impl Uid {
    /// Creates a user identifier from an unsigned value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Creates a user identifier from a signed raw value (returns `None` if negative).
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Process identifier of a requesting process.
///
/// # Invariants
/// - Always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(u32);

impl Pid {
    /// Creates a process identifier from an unsigned value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Creates a process identifier from a signed raw value (returns `None` if negative).
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Package Names
// ============================================================================

/// Errors returned when parsing a package name strictly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageNameError {
    /// Name was empty.
    #[error("package name must be non-empty")]
    Empty,
    /// Name exceeded the length limit.
    #[error("package name exceeds {MAX_PACKAGE_NAME_LENGTH} bytes")]
    TooLong,
    /// Name contained an empty segment or a disallowed character.
    #[error("package name is malformed: {0}")]
    Malformed(String),
}

/// Application package identity.
///
/// # Invariants
/// - [`PackageName::new`] is opaque and accepts any string reported by the OS.
/// - [`PackageName::parse`] only accepts dotted `[A-Za-z0-9_]` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Creates a package name without validation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parses a package name, rejecting anything outside the dotted identifier form.
    ///
    /// # Errors
    ///
    /// Returns [`PackageNameError`] when the name is empty, too long, or malformed.
    pub fn parse(name: &str) -> Result<Self, PackageNameError> {
        if name.is_empty() {
            return Err(PackageNameError::Empty);
        }
        if name.len() > MAX_PACKAGE_NAME_LENGTH {
            return Err(PackageNameError::TooLong);
        }
        let well_formed = name.split('.').all(|segment| {
            !segment.is_empty()
                && segment.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
        if !well_formed {
            return Err(PackageNameError::Malformed(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Returns true when the name would pass [`PackageName::parse`].
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        Self::parse(&self.0).is_ok()
    }

    /// Returns the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
