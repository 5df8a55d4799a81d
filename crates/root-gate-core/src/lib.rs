// crates/root-gate-core/src/lib.rs
// ============================================================================
// Module: Root Gate Core Library
// Description: Public API surface for the Root Gate core.
// Purpose: Expose core types, collaborator interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Root Gate core defines the request, identity, and policy types used by the
//! superuser authorization broker, the interfaces it uses to reach external
//! collaborators (package metadata, policy storage, command execution, the
//! decision pipe), and runtime helpers such as the identity resolver and an
//! in-memory policy store.
//!
//! Security posture: request descriptors and package metadata are untrusted;
//! every resolver path fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ChannelOpener;
pub use interfaces::ChannelTransport;
pub use interfaces::CommandRunner;
pub use interfaces::MetadataError;
pub use interfaces::PackageMetadata;
pub use interfaces::PolicyStore;
pub use interfaces::StoreError;
pub use runtime::IdentityResolver;
pub use runtime::InMemoryPolicyStore;
pub use runtime::ResolveError;
pub use runtime::StaticPackageMetadata;
