// crates/root-gate-core/src/runtime/resolver.rs
// ============================================================================
// Module: Root Gate Identity Resolver
// Description: Resolves a requesting uid/pid into a verified identity.
// Purpose: Never trust caller-claimed identity; ask the metadata service.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! Resolution tries a full package lookup first. On a miss it falls back to
//! the owning name of the uid and keeps only the shared group prefix (text
//! before the first `:`). A second miss fails with [`ResolveError::NotFound`].
//! Invariants:
//! - Exactly one [`Identity`] shape is produced per successful resolve.
//! - Internal metadata faults surface as [`ResolveError::Internal`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::Identity;
use crate::core::PackageName;
use crate::core::Pid;
use crate::core::Uid;
use crate::interfaces::MetadataError;
use crate::interfaces::PackageMetadata;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No package or owning name exists for the uid.
    #[error("no identity found for uid {0}")]
    NotFound(Uid),
    /// Metadata lookup failed on I/O.
    #[error("identity lookup io error: {0}")]
    Io(String),
    /// Metadata service failed unexpectedly.
    #[error("identity lookup internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    /// Returns true for conditions that fail a single request closed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Io(_))
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves request identities via a [`PackageMetadata`] service.
#[derive(Clone)]
pub struct IdentityResolver {
    /// Package metadata service.
    metadata: Arc<dyn PackageMetadata>,
}

impl IdentityResolver {
    /// Creates a resolver over the given metadata service.
    #[must_use]
    pub fn new(metadata: Arc<dyn PackageMetadata>) -> Self {
        Self {
            metadata,
        }
    }

    /// Resolves the identity of the process `(uid, pid)`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when neither lookup yields an identity or a
    /// lookup fails.
    pub fn resolve(&self, uid: Uid, pid: Option<Pid>) -> Result<Identity, ResolveError> {
        match self.metadata.lookup(uid, pid) {
            Ok(Some(record)) => return Ok(Identity::Package(record)),
            Ok(None) | Err(MetadataError::NotFound(_)) => {}
            Err(err) => return Err(map_metadata_error(err, uid)),
        }
        let name = match self.metadata.name_for_uid(uid) {
            Ok(Some(name)) => name,
            Ok(None) => return Err(ResolveError::NotFound(uid)),
            Err(err) => return Err(map_metadata_error(err, uid)),
        };
        Ok(Identity::Shared {
            uid,
            shared_identity: shared_prefix(&name).to_string(),
        })
    }

    /// Returns true when `package` is installed under `uid`, including as
    /// one member of a shared user group.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the metadata service fails.
    pub fn uid_owns_package(&self, uid: Uid, package: &PackageName) -> Result<bool, ResolveError> {
        match self.metadata.packages_for_uid(uid) {
            Ok(packages) => Ok(packages.contains(package)),
            Err(MetadataError::NotFound(_)) => Ok(false),
            Err(err) => Err(map_metadata_error(err, uid)),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the part of an owning name before the first `:`.
fn shared_prefix(name: &str) -> &str {
    name.split_once(':').map_or(name, |(prefix, _)| prefix)
}

/// Maps metadata failures into resolver errors.
fn map_metadata_error(err: MetadataError, uid: Uid) -> ResolveError {
    match err {
        MetadataError::NotFound(_) => ResolveError::NotFound(uid),
        MetadataError::Io(message) => ResolveError::Io(message),
        MetadataError::Internal(message) => ResolveError::Internal(message),
    }
}
