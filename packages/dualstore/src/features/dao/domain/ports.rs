//! DAO Port (Trait Interface)
//!
//! One contract, one implementation per backend:
//! - RawConnection: hand-written statements on a prepared connection
//! - OrmSession: session per operation, explicit begin/commit/rollback
//! - OrmManagedContext: persist-or-merge with explicit flush
//! - GridRegion: region put/size/key_set/get_all

use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::Entity;
use super::records::RecordSet;
use crate::shared::models::Result;

/// Backend an adapter talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    RawConnection,
    OrmSession,
    OrmManagedContext,
    GridRegion,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::RawConnection => "raw_connection",
            StorageBackend::OrmSession => "orm_session",
            StorageBackend::OrmManagedContext => "orm_managed_context",
            StorageBackend::GridRegion => "grid_region",
        }
    }

    pub fn is_relational(&self) -> bool {
        !matches!(self, StorageBackend::GridRegion)
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// DAO Port (Primary Interface)
///
/// Adapters hold only their backend handle; they keep no per-call state.
/// Backend failures arrive as `Connectivity` or `IntegrityViolation` errors.
pub trait Dao<T: Entity>: Send + Sync {
    fn backend(&self) -> StorageBackend;

    /// Number of stored records
    fn count(&self) -> Result<usize>;

    /// `Ok(None)` when no record has this identity
    fn find_by(&self, id: &T::Id) -> Result<Option<T>>;

    /// Lazy, finite, restartable sequence of every stored record
    fn find_all(&self) -> Result<RecordSet<T>>;

    /// Insert-or-update; assigns an identity when the record has none
    fn save(&self, record: T) -> Result<T>;

    fn exists(&self, id: &T::Id) -> Result<bool> {
        Ok(self.find_by(id)?.is_some())
    }
}

/// Batching Extension
///
/// `batch_insert` uses the backend's multi-row write path with autocommit off
/// for the whole call: either every record is stored or none is.
pub trait BatchingDao<T: Entity>: Dao<T> {
    fn batch_insert(&self, records: Vec<T>) -> Result<Vec<T>>;
}
