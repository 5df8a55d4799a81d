// crates/root-gate-core/src/core/mod.rs
// ============================================================================
// Module: Root Gate Core Types
// Description: Canonical request, identity, and policy structures.
// Purpose: Provide stable, serializable types shared by broker, store, and CLI.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types describe an incoming superuser request, the identity resolved
//! for it, and the policy records the broker persists. They are the single
//! source of truth for the store schema and CLI output.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod identity;
pub mod policy;
pub mod request;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::PackageName;
pub use identifiers::PackageNameError;
pub use identifiers::Pid;
pub use identifiers::Uid;
pub use identity::Identity;
pub use identity::PackageRecord;
pub use policy::AutoResponse;
pub use policy::Policy;
pub use policy::PolicyAction;
pub use policy::UnknownActionCode;
pub use request::MAX_CHANNEL_PATH_LENGTH;
pub use request::RequestDescriptor;
pub use request::RequestRejection;
pub use request::ValidatedRequest;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
