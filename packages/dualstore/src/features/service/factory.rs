//! Service assembly
//!
//! Handles (grid cache, data source) are built by the caller and passed in;
//! nothing here looks them up globally.

use dualstore_grid::GridCache;

use super::coordinator::DualStoreService;
use crate::config::{DualStoreConfig, RelationalBackend, RelationalConfig};
use crate::features::dao::domain::models::Gemstone;
use crate::features::dao::domain::ports::{BatchingDao, Dao};
use crate::features::dao::infrastructure::{
    ConnectionDao, ManagedContextDao, RegionDao, SessionDao,
};
use crate::features::relational::datasource::SqliteDataSource;
use crate::features::relational::entity_manager::EntityManagerFactory;
use crate::features::relational::mapping::{self, SqlEntity};
use crate::features::relational::pipeline::ConnectionPipeline;
use crate::features::relational::session::SessionFactory;
use crate::features::transaction::boundary::TransactionBoundary;
use crate::features::transaction::resource::GridTransactionResource;
use crate::features::validation::rules::{approved_gemstones, Validator};
use crate::shared::models::{DaoError, Result};

/// Relational adapter selected by `config.backend`
pub fn relational_dao<T: SqlEntity>(
    data_source: SqliteDataSource,
    config: &RelationalConfig,
) -> Box<dyn Dao<T>> {
    let sessions = || {
        SessionFactory::new(
            data_source.clone(),
            ConnectionPipeline::session(config.isolation),
        )
    };

    match config.backend {
        RelationalBackend::RawConnection => Box::new(
            ConnectionDao::<T>::new(data_source.clone(), config.isolation)
                .with_chunk_rows(config.batch_chunk_rows)
                .with_page_size(config.page_size),
        ),
        RelationalBackend::OrmSession => Box::new(
            SessionDao::<T>::new(sessions())
                .with_chunk_rows(config.batch_chunk_rows)
                .with_page_size(config.page_size),
        ),
        RelationalBackend::OrmManagedContext => Box::new(
            ManagedContextDao::<T>::new(EntityManagerFactory::new(sessions()))
                .with_page_size(config.page_size),
        ),
    }
}

/// Batch-capable relational adapter; the managed context has no batch path
pub fn batching_dao<T: SqlEntity>(
    data_source: SqliteDataSource,
    config: &RelationalConfig,
) -> Result<Box<dyn BatchingDao<T>>> {
    let dao: Box<dyn BatchingDao<T>> = match config.backend {
        RelationalBackend::RawConnection => Box::new(
            ConnectionDao::<T>::new(data_source, config.isolation)
                .with_chunk_rows(config.batch_chunk_rows)
                .with_page_size(config.page_size),
        ),
        RelationalBackend::OrmSession => Box::new(
            SessionDao::<T>::new(SessionFactory::new(
                data_source,
                ConnectionPipeline::session(config.isolation),
            ))
            .with_chunk_rows(config.batch_chunk_rows)
            .with_page_size(config.page_size),
        ),
        RelationalBackend::OrmManagedContext => {
            return Err(DaoError::config(
                "orm_managed_context has no batch insert path",
            ))
        }
    };
    Ok(dao)
}

impl<T: SqlEntity> DualStoreService<T> {
    /// Build the service from configuration.
    ///
    /// Creates the grid region and the table, picks the relational adapter,
    /// and enlists the data source then the grid in the boundary. Grid keys
    /// start past any identity already stored in the table.
    pub fn from_config(
        config: &DualStoreConfig,
        cache: &GridCache,
        data_source: SqliteDataSource,
        validator: Validator<T>,
    ) -> Result<Self> {
        config.validate()?;
        data_source.ensure_table::<T>()?;
        let first_key = first_free_key::<T>(&data_source, config.grid.key_start)?;

        let region = cache.create_region::<i64, T>(config.grid.region.as_str())?;
        let grid = RegionDao::with_sequence(region, first_key)
            .with_page_size(config.grid.page_size);
        let relational = relational_dao::<T>(data_source.clone(), &config.relational);

        // Relational commits before the grid, so a failed SQLite commit
        // still rolls the grid back
        let boundary = TransactionBoundary::new()
            .enlist(data_source)
            .enlist(GridTransactionResource::from_cache(cache))
            .with_policy(config.transaction.rollback_policy());

        tracing::info!(
            region = %config.grid.region,
            backend = %config.relational.backend.storage_backend(),
            "dual-store service ready"
        );
        Ok(Self::new(grid, relational, validator, boundary))
    }
}

/// First grid key that cannot collide with a stored row: `key_start`, or one
/// past the table's largest identity when that is higher
fn first_free_key<T: SqlEntity>(data_source: &SqliteDataSource, key_start: i64) -> Result<i64> {
    let stored_max = mapping::max_id::<T>(&*data_source.connection()?)?;
    let first = match stored_max {
        Some(max) => key_start.max(max.saturating_add(1)),
        None => key_start,
    };
    if first != key_start {
        tracing::info!(
            table = T::TABLE,
            key_start,
            first_key = first,
            "grid keys continue after stored rows"
        );
    }
    Ok(first)
}

/// Gemstone service validating names against `config.validation.allowed_names`
pub fn gemstone_service(
    config: &DualStoreConfig,
    cache: &GridCache,
    data_source: SqliteDataSource,
) -> Result<DualStoreService<Gemstone>> {
    let validator =
        Validator::new().with_rule(approved_gemstones(&config.validation.allowed_names));
    DualStoreService::from_config(config, cache, data_source, validator)
}
