// crates/root-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Root Gate In-Memory Store
// Description: Simple in-memory policy store for tests and embedding.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`PolicyStore`] with
//! the same upsert and pruning semantics as the durable `SQLite` store. It is
//! not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Policy;
use crate::core::Uid;
use crate::interfaces::PolicyStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory policy store keyed by uid.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPolicyStore {
    /// Policy map protected by a mutex.
    policies: Arc<Mutex<BTreeMap<Uid, Policy>>>,
}

impl InMemoryPolicyStore {
    /// Creates an empty in-memory policy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the policy map.
    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Uid, Policy>>, StoreError> {
        self.policies
            .lock()
            .map_err(|_| StoreError::Store("policy store mutex poisoned".to_string()))
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get(&self, uid: Uid) -> Result<Option<Policy>, StoreError> {
        Ok(self.guard()?.get(&uid).copied())
    }

    fn update(&self, policy: &Policy) -> Result<(), StoreError> {
        if !policy.is_persistent() {
            return Err(StoreError::Invalid(format!(
                "policy for uid {} is not persistent (until {})",
                policy.uid, policy.until
            )));
        }
        self.guard()?.insert(policy.uid, *policy);
        Ok(())
    }

    fn delete(&self, uid: Uid) -> Result<bool, StoreError> {
        Ok(self.guard()?.remove(&uid).is_some())
    }

    fn list(&self) -> Result<Vec<Policy>, StoreError> {
        Ok(self.guard()?.values().copied().collect())
    }

    fn prune_expired(&self, now_seconds: i64) -> Result<usize, StoreError> {
        let mut guard = self.guard()?;
        let before = guard.len();
        guard.retain(|_, policy| !(policy.until > 0 && policy.until <= now_seconds));
        Ok(before - guard.len())
    }
}
