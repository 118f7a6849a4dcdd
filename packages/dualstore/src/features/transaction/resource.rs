//! Resources a `TransactionBoundary` can enlist

use dualstore_grid::{CacheTransactionManager, GridCache, TransactionId};

use crate::features::relational::datasource::SqliteDataSource;
use crate::shared::models::{DaoError, Result};

/// Something with begin/commit/rollback that joins a logical unit of work
pub trait TransactionalResource: Send + Sync {
    fn name(&self) -> &str;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}

/// The data source's connection; adapters sharing it join the transaction
impl TransactionalResource for SqliteDataSource {
    fn name(&self) -> &str {
        SqliteDataSource::name(self)
    }

    fn begin(&self) -> Result<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            return Err(DaoError::transaction(format!(
                "a transaction is already open on {}",
                SqliteDataSource::name(self)
            )));
        }
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.connection()?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let conn = self.connection()?;
        // SQLite ends the transaction itself on some errors
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

/// Grid transaction of the calling thread
#[derive(Debug, Clone)]
pub struct GridTransactionResource {
    name: String,
    manager: CacheTransactionManager,
}

impl GridTransactionResource {
    pub fn new(name: impl Into<String>, manager: CacheTransactionManager) -> Self {
        Self {
            name: name.into(),
            manager,
        }
    }

    pub fn from_cache(cache: &GridCache) -> Self {
        Self::new(format!("grid:{}", cache.name()), cache.transaction_manager())
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.manager.transaction_id()
    }
}

impl TransactionalResource for GridTransactionResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&self) -> Result<()> {
        let id = self.manager.begin()?;
        tracing::trace!(resource = %self.name, grid_tx = %id, "grid transaction begun");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        Ok(self.manager.commit()?)
    }

    fn rollback(&self) -> Result<()> {
        Ok(self.manager.rollback()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ErrorKind;

    #[test]
    fn test_data_source_resource() {
        let ds = SqliteDataSource::in_memory().unwrap();
        TransactionalResource::begin(&ds).unwrap();
        assert!(ds.in_transaction().unwrap());

        let err = TransactionalResource::begin(&ds).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transaction);

        TransactionalResource::rollback(&ds).unwrap();
        assert!(!ds.in_transaction().unwrap());
        // Nothing open: rollback is a no-op
        TransactionalResource::rollback(&ds).unwrap();
    }

    #[test]
    fn test_grid_resource() {
        let cache = GridCache::new("test");
        let grid = GridTransactionResource::from_cache(&cache);
        assert_eq!(grid.name(), "grid:test");

        grid.begin().unwrap();
        assert!(grid.transaction_id().is_some());
        grid.commit().unwrap();
        assert!(grid.transaction_id().is_none());

        assert_eq!(grid.commit().unwrap_err().kind, ErrorKind::Transaction);
    }
}
