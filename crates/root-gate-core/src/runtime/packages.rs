// crates/root-gate-core/src/runtime/packages.rs
// ============================================================================
// Module: Root Gate Static Package Metadata
// Description: Package metadata service backed by a fixed record table.
// Purpose: Serve identity lookups from configuration when no OS service exists.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`StaticPackageMetadata`] answers lookups from a configured list of
//! [`PackageRecord`] values. A uid that belongs to a shared user group cannot
//! be narrowed to a single package without OS process data, so full lookups
//! for such uids miss and callers fall back to the group name, reported as
//! `"<shared_user_id>:<uid>"`. [`PackageMetadata::packages_for_uid`] still
//! lists every member of the group so ownership checks stay exact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::PackageName;
use crate::core::PackageRecord;
use crate::core::Pid;
use crate::core::Uid;
use crate::interfaces::MetadataError;
use crate::interfaces::PackageMetadata;

// ============================================================================
// SECTION: Static Metadata
// ============================================================================

/// Package metadata served from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticPackageMetadata {
    /// Records grouped by uid.
    by_uid: BTreeMap<Uid, Vec<PackageRecord>>,
}

impl StaticPackageMetadata {
    /// Builds the table from package records.
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = PackageRecord>) -> Self {
        let mut by_uid: BTreeMap<Uid, Vec<PackageRecord>> = BTreeMap::new();
        for record in records {
            by_uid.entry(record.uid).or_default().push(record);
        }
        Self {
            by_uid,
        }
    }

    /// Returns the shared user id for `uid`, if any record declares one.
    fn shared_user(&self, uid: Uid) -> Option<&str> {
        self.by_uid
            .get(&uid)?
            .iter()
            .find_map(|record| record.shared_user_id.as_deref())
    }
}

impl PackageMetadata for StaticPackageMetadata {
    fn lookup(&self, uid: Uid, _pid: Option<Pid>) -> Result<Option<PackageRecord>, MetadataError> {
        if self.shared_user(uid).is_some() {
            return Ok(None);
        }
        match self.by_uid.get(&uid).map(Vec::as_slice) {
            Some([record]) => Ok(Some(record.clone())),
            _ => Ok(None),
        }
    }

    fn name_for_uid(&self, uid: Uid) -> Result<Option<String>, MetadataError> {
        if let Some(shared) = self.shared_user(uid) {
            return Ok(Some(format!("{shared}:{uid}")));
        }
        match self.by_uid.get(&uid).map(Vec::as_slice) {
            Some([record]) => Ok(Some(record.package_name.as_str().to_string())),
            _ => Ok(None),
        }
    }

    fn packages_for_uid(&self, uid: Uid) -> Result<Vec<PackageName>, MetadataError> {
        Ok(self
            .by_uid
            .get(&uid)
            .map(|records| records.iter().map(|record| record.package_name.clone()).collect())
            .unwrap_or_default())
    }
}
