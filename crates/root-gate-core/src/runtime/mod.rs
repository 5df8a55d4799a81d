// crates/root-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Root Gate Runtime
// Description: Identity resolution and reference collaborator implementations.
// Purpose: Provide the resolver plus in-memory store and static metadata.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime helpers that sit directly on top of the collaborator interfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod packages;
pub mod resolver;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use packages::StaticPackageMetadata;
pub use resolver::IdentityResolver;
pub use resolver::ResolveError;
pub use store::InMemoryPolicyStore;
