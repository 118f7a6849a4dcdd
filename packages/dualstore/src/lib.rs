/*
 * Dualstore - transactional writes across a data grid and a relational store
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Error taxonomy (DaoError, ErrorKind)
 * - features/    : dao → relational → validation → transaction → service
 * - config/      : YAML configuration
 *
 * All I/O is blocking and runs on the caller's thread.
 */

//! # Dualstore
//!
//! Writes one logical record into a grid region and a relational table inside
//! a single transaction boundary, validates it, and commits or rolls back both.
//!
//! ```rust
//! use dualstore::config::DualStoreConfig;
//! use dualstore::features::dao::Gemstone;
//! use dualstore::features::service::gemstone_service;
//! use dualstore_grid::GridCache;
//!
//! let config = DualStoreConfig::default();
//! let cache = GridCache::new("example");
//! let service = gemstone_service(&config, &cache, config.open_data_source().unwrap()).unwrap();
//!
//! let diamond = service.save(Gemstone::new("DIAMOND")).unwrap();
//! assert!(diamond.id.is_some());
//!
//! let err = service.save(Gemstone::new("Coal")).unwrap_err();
//! assert!(err.is_validation());
//! assert_eq!(service.relational_count().unwrap(), 1);
//! assert_eq!(service.grid_count().unwrap(), 1);
//! ```

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration (YAML schema v1)
pub mod config;

/// Vertical feature slices
pub mod features;

/// Shared models
pub mod shared;

pub use config::{ConfigError, DualStoreConfig, RelationalBackend};
pub use features::dao::{
    BatchingDao, ConnectionDao, Dao, Entity, Gemstone, ManagedContextDao, RecordSet, RegionDao,
    SessionDao, StorageBackend,
};
pub use features::relational::{IsolationLevel, SqliteDataSource};
pub use features::service::{gemstone_service, DualStoreService, SavePhase};
pub use features::transaction::{RollbackPolicy, TransactionBoundary, TransactionContext};
pub use features::validation::{ValidationRule, Validator};
pub use shared::models::{DaoError, ErrorKind, Result};
