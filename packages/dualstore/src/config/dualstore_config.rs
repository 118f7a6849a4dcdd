//! DualStoreConfig - YAML schema v1
//!
//! ```yaml
//! version: 1
//! relational:
//!   backend: orm_session        # raw_connection | orm_session | orm_managed_context
//!   path: /var/lib/gems.db      # omit for an in-memory database
//!   isolation: read_committed
//!   busy_timeout_ms: 5000
//!   batch_chunk_rows: 500
//!   page_size: 256
//! grid:
//!   region: Gemstones
//!   key_start: 1
//!   page_size: 256
//! validation:
//!   allowed_names: [DIAMOND, RUBY]
//! transaction:
//!   no_rollback_for: [application]
//! ```
//!
//! Every section and field is optional except `version`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::features::dao::domain::ports::StorageBackend;
use crate::features::relational::datasource::{
    DataSourceSettings, IsolationLevel, SqliteDataSource,
};
use crate::features::transaction::policy::RollbackPolicy;
use crate::features::validation::rules::DEFAULT_APPROVED_GEMS;
use crate::shared::models::{ErrorKind, Result};

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Relational adapter variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationalBackend {
    #[default]
    RawConnection,
    OrmSession,
    OrmManagedContext,
}

impl RelationalBackend {
    pub fn storage_backend(&self) -> StorageBackend {
        match self {
            RelationalBackend::RawConnection => StorageBackend::RawConnection,
            RelationalBackend::OrmSession => StorageBackend::OrmSession,
            RelationalBackend::OrmManagedContext => StorageBackend::OrmManagedContext,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationalConfig {
    pub backend: RelationalBackend,

    /// Database file; `None` opens a private in-memory database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    pub isolation: IsolationLevel,

    pub busy_timeout_ms: u64,

    /// Rows per multi-row insert statement
    pub batch_chunk_rows: usize,

    /// `find_all` page size
    pub page_size: usize,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            backend: RelationalBackend::default(),
            path: None,
            isolation: IsolationLevel::ReadCommitted,
            busy_timeout_ms: 5_000,
            batch_chunk_rows: 500,
            page_size: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub region: String,
    /// First key handed out to records saved without identity
    pub key_start: i64,
    pub page_size: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            region: "Gemstones".to_string(),
            key_start: 1,
            page_size: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Approved gem names (matched case-insensitively)
    pub allowed_names: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_names: DEFAULT_APPROVED_GEMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionConfig {
    /// Error kinds that commit instead of rolling back
    pub no_rollback_for: Vec<ErrorKind>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            no_rollback_for: vec![ErrorKind::Application],
        }
    }
}

impl TransactionConfig {
    pub fn rollback_policy(&self) -> RollbackPolicy {
        RollbackPolicy::no_rollback_for(self.no_rollback_for.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DualStoreConfig {
    /// Schema version (always 1 for v1)
    pub version: u32,

    #[serde(default)]
    pub relational: RelationalConfig,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub transaction: TransactionConfig,
}

impl Default for DualStoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            relational: RelationalConfig::default(),
            grid: GridConfig::default(),
            validation: ValidationConfig::default(),
            transaction: TransactionConfig::default(),
        }
    }
}

impl DualStoreConfig {
    /// Defaults with the given relational adapter
    pub fn with_backend(backend: RelationalBackend) -> Self {
        let mut config = Self::default();
        config.relational.backend = backend;
        config
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let relational = &self.relational;
        if relational.batch_chunk_rows == 0 || relational.batch_chunk_rows > 10_000 {
            return Err(ConfigError::range_with_hint(
                "relational.batch_chunk_rows",
                relational.batch_chunk_rows,
                1,
                10_000,
                "Each multi-row statement needs at least one row",
            ));
        }

        if relational.page_size == 0 || relational.page_size > 100_000 {
            return Err(ConfigError::range_with_hint(
                "relational.page_size",
                relational.page_size,
                1,
                100_000,
                "find_all pages must hold at least one record",
            ));
        }

        if relational.busy_timeout_ms > 600_000 {
            return Err(ConfigError::range_with_hint(
                "relational.busy_timeout_ms",
                relational.busy_timeout_ms,
                0,
                600_000,
                "Lock waits should be at most 10 minutes",
            ));
        }

        if self.grid.region.trim().is_empty() {
            return Err(ConfigError::Custom(
                "grid.region must not be empty".to_string(),
            ));
        }

        if self.grid.page_size == 0 || self.grid.page_size > 100_000 {
            return Err(ConfigError::range_with_hint(
                "grid.page_size",
                self.grid.page_size,
                1,
                100_000,
                "find_all pages must hold at least one record",
            ));
        }

        if self.validation.allowed_names.is_empty() {
            tracing::warn!("validation.allowed_names is empty; every save will be rejected");
        }

        Ok(())
    }

    pub fn data_source_settings(&self) -> DataSourceSettings {
        DataSourceSettings {
            busy_timeout: Duration::from_millis(self.relational.busy_timeout_ms),
            wal: true,
        }
    }

    /// Open the configured database
    pub fn open_data_source(&self) -> Result<SqliteDataSource> {
        match &self.relational.path {
            Some(path) => SqliteDataSource::open(path, &self.data_source_settings()),
            None => SqliteDataSource::in_memory(),
        }
    }
}
