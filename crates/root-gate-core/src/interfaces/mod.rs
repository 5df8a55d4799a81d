// crates/root-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Root Gate Interfaces
// Description: Collaborator interfaces for metadata, storage, commands, and pipes.
// Purpose: Define the contract surfaces the broker uses to reach the OS.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The broker talks to the outside world only through these traits. Every
//! implementation must be callable from a blocking worker thread, so all of
//! them are `Send + Sync`. Implementations must fail closed on missing or
//! invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::core::PackageName;
use crate::core::Pid;
use crate::core::Policy;
use crate::core::identifiers::Uid;
use crate::core::identity::PackageRecord;

// ============================================================================
// SECTION: Package Metadata
// ============================================================================

/// Package metadata lookup errors.
///
/// # Invariants
/// - `NotFound` and `Io` are expected conditions; `Internal` is a defect.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No package matched the query.
    #[error("package metadata not found: {0}")]
    NotFound(String),
    /// Lookup failed on I/O.
    #[error("package metadata io error: {0}")]
    Io(String),
    /// Lookup service failed in an unexpected way.
    #[error("package metadata internal error: {0}")]
    Internal(String),
}

/// Package metadata service.
pub trait PackageMetadata: Send + Sync {
    /// Looks up the installed package running as `uid` (and `pid` when known).
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup cannot be completed.
    fn lookup(&self, uid: Uid, pid: Option<Pid>) -> Result<Option<PackageRecord>, MetadataError>;

    /// Returns the name owning `uid` (for shared uids, `group:uid`).
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup cannot be completed.
    fn name_for_uid(&self, uid: Uid) -> Result<Option<String>, MetadataError>;

    /// Lists every package installed under `uid`, shared members included.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup cannot be completed.
    fn packages_for_uid(&self, uid: Uid) -> Result<Vec<PackageName>, MetadataError>;
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Policy store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("policy store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("policy store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("policy store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("policy store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("policy store error: {0}")]
    Store(String),
}

/// Durable policy store keyed by subject uid.
pub trait PolicyStore: Send + Sync {
    /// Loads the policy for `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get(&self, uid: Uid) -> Result<Option<Policy>, StoreError>;

    /// Inserts or replaces the policy for `policy.uid`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn update(&self, policy: &Policy) -> Result<(), StoreError>;

    /// Removes the policy for `uid`, returning true if one existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete(&self, uid: Uid) -> Result<bool, StoreError>;

    /// Returns all policies ordered by uid.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list(&self) -> Result<Vec<Policy>, StoreError>;

    /// Deletes timed policies whose deadline is at or before `now_seconds`.
    ///
    /// One-shot records (`until == 0`) are kept. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn prune_expired(&self, now_seconds: i64) -> Result<usize, StoreError>;
}

// ============================================================================
// SECTION: Command Runner
// ============================================================================

/// Fire-and-forget privileged command execution.
pub trait CommandRunner: Send + Sync {
    /// Starts `command` in the background; output and failures are discarded.
    fn spawn_detached(&self, command: &str);
}

// ============================================================================
// SECTION: Decision Pipe
// ============================================================================

/// Byte transport backing a decision channel.
pub trait ChannelTransport: Send {
    /// Writes all bytes.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the write fails.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flushes buffered bytes.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the flush fails.
    fn flush(&mut self) -> io::Result<()>;

    /// Releases the transport.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when releasing fails.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens decision transports for caller-supplied paths.
pub trait ChannelOpener: Send + Sync {
    /// Opens the transport bound to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the path cannot be opened for writing.
    fn open(&self, path: &Path) -> io::Result<Box<dyn ChannelTransport>>;
}
