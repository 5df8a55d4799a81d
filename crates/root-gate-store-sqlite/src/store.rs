// crates/root-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Policy Store
// Description: Durable PolicyStore backed by SQLite.
// Purpose: Persist superuser decisions keyed by subject uid.
// Dependencies: root-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`PolicyStore`] using `SQLite`. One row per
//! subject uid holds the decided action code and the raw `until` value.
//! Rows are validated on every read and fail closed on corruption: an unknown
//! action code or an out-of-range uid is never turned into a decision.
//! Security posture: database contents are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use root_gate_core::Policy;
use root_gate_core::PolicyAction;
use root_gate_core::PolicyStore;
use root_gate_core::StoreError;
use root_gate_core::Uid;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` policy store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for `path`.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }

    /// Validates path limits without touching the filesystem contents.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when the path is unusable.
    pub fn validate(&self) -> Result<(), SqliteStoreError> {
        validate_store_path(&self.path)
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row failed validation.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed policy store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Only persistent policies (`until >= 0`) are written.
#[derive(Clone)]
pub struct SqlitePolicyStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqlitePolicyStore {
    /// Opens an `SQLite`-backed policy store, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Loads the policy for `uid`.
    fn load(&self, uid: Uid) -> Result<Option<Policy>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT uid, action, until FROM policies WHERE uid = ?1",
                params![i64::from(uid.get())],
                read_row,
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(decode_row).transpose()
    }

    /// Upserts a persistent policy.
    fn save(&self, policy: &Policy) -> Result<(), SqliteStoreError> {
        if !policy.is_persistent() {
            return Err(SqliteStoreError::Invalid(format!(
                "policy for uid {} is not persistent (until {})",
                policy.uid, policy.until
            )));
        }
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO policies (uid, action, until, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(uid) DO UPDATE SET
                     action = excluded.action,
                     until = excluded.until,
                     updated_at = excluded.updated_at",
                params![
                    i64::from(policy.uid.get()),
                    policy.action.code(),
                    policy.until,
                    unix_seconds_now()
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Deletes the row for `uid`.
    fn remove(&self, uid: Uid) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute("DELETE FROM policies WHERE uid = ?1", params![i64::from(uid.get())])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(changed > 0)
    }

    /// Loads every row ordered by uid.
    fn load_all(&self) -> Result<Vec<Policy>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare("SELECT uid, action, until FROM policies ORDER BY uid ASC")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![], read_row)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut policies = Vec::new();
        for row in rows {
            let row = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            policies.push(decode_row(row)?);
        }
        Ok(policies)
    }

    /// Deletes timed rows whose deadline has passed.
    fn prune(&self, now_seconds: i64) -> Result<usize, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute("DELETE FROM policies WHERE until > 0 AND until <= ?1", params![now_seconds])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
    }
}

impl PolicyStore for SqlitePolicyStore {
    fn get(&self, uid: Uid) -> Result<Option<Policy>, StoreError> {
        Ok(self.load(uid)?)
    }

    fn update(&self, policy: &Policy) -> Result<(), StoreError> {
        Ok(self.save(policy)?)
    }

    fn delete(&self, uid: Uid) -> Result<bool, StoreError> {
        Ok(self.remove(uid)?)
    }

    fn list(&self) -> Result<Vec<Policy>, StoreError> {
        Ok(self.load_all()?)
    }

    fn prune_expired(&self, now_seconds: i64) -> Result<usize, StoreError> {
        Ok(self.prune(now_seconds)?)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Raw policy row as stored.
struct PolicyRow {
    /// Stored uid.
    uid: i64,
    /// Stored action code.
    action: i64,
    /// Stored raw expiry.
    until: i64,
}

/// Reads the raw columns of a policy row.
fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PolicyRow> {
    Ok(PolicyRow {
        uid: row.get(0)?,
        action: row.get(1)?,
        until: row.get(2)?,
    })
}

/// Validates a raw row into a policy.
fn decode_row(row: PolicyRow) -> Result<Policy, SqliteStoreError> {
    let uid = Uid::from_raw(row.uid)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("uid out of range: {}", row.uid)))?;
    let action = i32::try_from(row.action)
        .ok()
        .and_then(|code| PolicyAction::from_code(code).ok())
        .ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("unknown action code {} for uid {uid}", row.action))
        })?;
    if row.until < 0 {
        return Err(SqliteStoreError::Corrupt(format!(
            "negative until {} stored for uid {uid}",
            row.until
        )));
    }
    Ok(Policy {
        uid,
        action,
        until: row.until,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current unix time in seconds, saturating on overflow.
fn unix_seconds_now() -> i64 {
    let seconds = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    i64::try_from(seconds).unwrap_or(i64::MAX)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS policies (
                    uid INTEGER PRIMARY KEY NOT NULL,
                    action INTEGER NOT NULL,
                    until INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_policies_until ON policies (until);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
