// crates/root-gate-config/src/lib.rs
// ============================================================================
// Module: Root Gate Config
// Description: Canonical configuration model and validation for Root Gate.
// Purpose: Load `root-gate.toml` into typed, validated settings.
// Dependencies: root-gate-core, root-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Typed configuration for the broker, the policy store backend, the audit
//! sink, and the static package table. Loading fails closed on any invalid
//! input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkType;
pub use config::BrokerSection;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::PackageEntry;
pub use config::RootGateConfig;
pub use config::StoreConfig;
pub use config::StoreType;
