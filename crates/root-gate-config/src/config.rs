// crates/root-gate-config/src/config.rs
// ============================================================================
// Module: Root Gate Configuration
// Description: Configuration loading and validation for Root Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: root-gate-core, root-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a broker never starts with a
//! malformed self identity, an unusable store path, or an ambiguous package
//! table.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use root_gate_core::AutoResponse;
use root_gate_core::PackageName;
use root_gate_core::PackageRecord;
use root_gate_core::Uid;
use root_gate_store_sqlite::SqliteStoreConfig;
use root_gate_store_sqlite::SqliteStoreMode;
use root_gate_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "root-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ROOT_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of static package entries.
pub(crate) const MAX_PACKAGE_ENTRIES: usize = 4096;
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Root Gate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RootGateConfig {
    /// Broker configuration.
    pub broker: BrokerSection,
    /// Policy store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Static package table.
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

impl RootGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// `root-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        validate_packages(&self.packages)
    }

    /// Returns the static package table as core records.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an entry fails validation.
    pub fn package_records(&self) -> Result<Vec<PackageRecord>, ConfigError> {
        self.packages.iter().map(PackageEntry::to_record).collect()
    }
}

// ============================================================================
// SECTION: Broker Section
// ============================================================================

/// Broker behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSection {
    /// Package identity of the broker application itself.
    pub self_package: String,
    /// Standing auto-response consulted before prompting.
    #[serde(default)]
    pub auto_response: AutoResponse,
    /// Reject decision channels that are not named pipes.
    #[serde(default = "default_require_fifo")]
    pub require_fifo: bool,
}

impl BrokerSection {
    /// Validates broker configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.self_package_name().map(|_| ())
    }

    /// Returns the parsed self package name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the name is malformed.
    pub fn self_package_name(&self) -> Result<PackageName, ConfigError> {
        PackageName::parse(&self.self_package)
            .map_err(|err| ConfigError::Invalid(format!("broker.self_package: {err}")))
    }
}

/// Returns the default FIFO requirement.
const fn default_require_fifo() -> bool {
    true
}

// ============================================================================
// SECTION: Store Section
// ============================================================================

/// Policy store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store (decisions are lost on exit).
    #[default]
    Memory,
    /// Use `SQLite`-backed durable store.
    Sqlite,
}

/// Policy store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` store configuration when the sqlite backend is
    /// selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

/// Returns the default store busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Audit Section
// ============================================================================

/// Audit sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkType {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    None,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: AuditSinkType,
    /// Log path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkType::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (AuditSinkType::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (AuditSinkType::Stderr | AuditSinkType::None, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid for the file sink".to_string(),
            )),
            (AuditSinkType::Stderr | AuditSinkType::None, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Package Table
// ============================================================================

/// Static package table entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageEntry {
    /// Uid the package runs as.
    pub uid: u32,
    /// Package name.
    pub package_name: String,
    /// Shared user group, when the uid is shared.
    #[serde(default)]
    pub shared_user_id: Option<String>,
    /// Human-readable version.
    #[serde(default)]
    pub version_name: Option<String>,
}

impl PackageEntry {
    /// Converts the entry into a validated core record.
    fn to_record(&self) -> Result<PackageRecord, ConfigError> {
        let package_name = PackageName::parse(&self.package_name).map_err(|err| {
            ConfigError::Invalid(format!("packages[{}].package_name: {err}", self.uid))
        })?;
        if let Some(shared) = &self.shared_user_id {
            PackageName::parse(shared).map_err(|err| {
                ConfigError::Invalid(format!("packages[{}].shared_user_id: {err}", self.uid))
            })?;
        }
        Ok(PackageRecord {
            uid: Uid::new(self.uid),
            package_name,
            shared_user_id: self.shared_user_id.clone(),
            version_name: self.version_name.clone(),
        })
    }
}

/// Validates the package table.
fn validate_packages(packages: &[PackageEntry]) -> Result<(), ConfigError> {
    if packages.len() > MAX_PACKAGE_ENTRIES {
        return Err(ConfigError::Invalid(format!(
            "packages exceeds {MAX_PACKAGE_ENTRIES} entries"
        )));
    }
    let mut seen = BTreeSet::new();
    for entry in packages {
        entry.to_record()?;
        if !seen.insert((entry.uid, entry.package_name.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "duplicate package entry {} for uid {}",
                entry.package_name, entry.uid
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
