// crates/root-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Policy Store
// Description: Durable PolicyStore backend using SQLite.
// Purpose: Persist superuser decisions across broker restarts.
// Dependencies: root-gate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`PolicyStore`] implementation holding
//! one decision row per subject uid. It validates stored rows on read and
//! prunes timed decisions once their deadline passes. Security posture:
//! storage inputs are untrusted.
//!
//! [`PolicyStore`]: root_gate_core::PolicyStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqlitePolicyStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
