// crates/root-gate-core/src/core/identity.rs
// ============================================================================
// Module: Root Gate Identity
// Description: Resolved identity of a requesting process.
// Purpose: Distinguish full package identities from shared-uid fallbacks.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`Identity`] is either a full package record or the shared-user group
//! name that owns a uid. Exactly one shape is populated per request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PackageName;
use crate::core::identifiers::Uid;

// ============================================================================
// SECTION: Package Records
// ============================================================================

/// Installed-package record reported by the package metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Uid the package runs under.
    pub uid: Uid,
    /// Package name.
    pub package_name: PackageName,
    /// Shared user id when the package shares its uid with others.
    #[serde(default)]
    pub shared_user_id: Option<String>,
    /// Human-readable version label when known.
    #[serde(default)]
    pub version_name: Option<String>,
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Verified identity of a requesting process.
///
/// # Invariants
/// - `Shared` carries only the group prefix (text before the first `:`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    /// Full application identity.
    Package(PackageRecord),
    /// Shared-uid group identity when no single package matched.
    Shared {
        /// Requesting uid.
        uid: Uid,
        /// Shared identity group name.
        shared_identity: String,
    },
}

impl Identity {
    /// Returns the uid this identity was resolved for.
    #[must_use]
    pub const fn uid(&self) -> Uid {
        match self {
            Self::Package(record) => record.uid,
            Self::Shared {
                uid, ..
            } => *uid,
        }
    }

    /// Returns the package name for full package identities.
    #[must_use]
    pub const fn package_name(&self) -> Option<&PackageName> {
        match self {
            Self::Package(record) => Some(&record.package_name),
            Self::Shared {
                ..
            } => None,
        }
    }

    /// Returns a display label for logs and prompts.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Package(record) => record.package_name.as_str(),
            Self::Shared {
                shared_identity, ..
            } => shared_identity,
        }
    }
}
