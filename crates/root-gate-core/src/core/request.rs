// crates/root-gate-core/src/core/request.rs
// ============================================================================
// Module: Root Gate Request Descriptor
// Description: Raw superuser request descriptor and its validation.
// Purpose: Turn untrusted caller fields into a validated request.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`RequestDescriptor`] is exactly what the privileged caller handed over:
//! a pipe path and two signed integers where `-1` means "absent". Nothing in
//! it is trusted. [`RequestDescriptor::validate`] is the only way to obtain a
//! [`ValidatedRequest`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::Pid;
use crate::core::identifiers::Uid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted length of a channel path.
pub const MAX_CHANNEL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single channel path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Raw value used by callers for an absent integer field.
const ABSENT: i32 = -1;

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// Raw request descriptor supplied by the privileged caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Path to the pre-created decision pipe.
    #[serde(default)]
    pub channel_path: Option<String>,
    /// Requesting uid (`-1` when absent).
    #[serde(default = "absent")]
    pub requesting_uid: i32,
    /// Requesting pid (`-1` when absent).
    #[serde(default = "absent")]
    pub requesting_pid: i32,
}

/// Serde default for absent integer fields.
const fn absent() -> i32 {
    ABSENT
}

/// Reasons a descriptor is rejected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestRejection {
    /// No channel path was supplied.
    #[error("request is missing a channel path")]
    MissingChannelPath,
    /// Channel path was empty or exceeded length limits.
    #[error("request channel path is invalid: {0}")]
    InvalidChannelPath(String),
    /// Uid was absent or negative.
    #[error("request uid is invalid: {0}")]
    InvalidUid(i32),
}

/// Request whose fields passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Decision pipe path.
    pub channel_path: PathBuf,
    /// Requesting uid.
    pub uid: Uid,
    /// Requesting pid, when supplied.
    pub pid: Option<Pid>,
}

impl RequestDescriptor {
    /// Creates a descriptor from raw caller values.
    #[must_use]
    pub fn new(channel_path: Option<String>, requesting_uid: i32, requesting_pid: i32) -> Self {
        Self {
            channel_path,
            requesting_uid,
            requesting_pid,
        }
    }

    /// Validates the descriptor.
    ///
    /// A negative pid is treated as absent rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RequestRejection`] when the channel path or uid is unusable.
    pub fn validate(&self) -> Result<ValidatedRequest, RequestRejection> {
        let raw_path = self.channel_path.as_deref().ok_or(RequestRejection::MissingChannelPath)?;
        validate_channel_path(raw_path)?;
        let uid = Uid::from_raw(i64::from(self.requesting_uid))
            .ok_or(RequestRejection::InvalidUid(self.requesting_uid))?;
        Ok(ValidatedRequest {
            channel_path: PathBuf::from(raw_path),
            uid,
            pid: Pid::from_raw(i64::from(self.requesting_pid)),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Applies length limits to a caller-supplied channel path.
fn validate_channel_path(raw: &str) -> Result<(), RequestRejection> {
    if raw.trim().is_empty() {
        return Err(RequestRejection::InvalidChannelPath("path is empty".to_string()));
    }
    if raw.len() > MAX_CHANNEL_PATH_LENGTH {
        return Err(RequestRejection::InvalidChannelPath("path exceeds max length".to_string()));
    }
    if raw.contains('\0') {
        return Err(RequestRejection::InvalidChannelPath("path contains nul".to_string()));
    }
    for component in Path::new(raw).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(RequestRejection::InvalidChannelPath(
                "path component too long".to_string(),
            ));
        }
    }
    Ok(())
}
