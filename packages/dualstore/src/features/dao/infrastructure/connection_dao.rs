//! RawConnection adapter
//!
//! Hand-written statements on the data source's connection. Every path that
//! holds the connection runs the preparation pipeline (validate open, set
//! isolation) before its first statement. `save` picks insert or update with
//! an `exists` pre-check instead of a native upsert.

use std::marker::PhantomData;

use parking_lot::MappedMutexGuard;
use rusqlite::Connection;

use crate::features::dao::domain::ports::{BatchingDao, Dao, StorageBackend};
use crate::features::dao::domain::records::{Page, RecordSet};
use crate::features::relational::datasource::{
    within_unit_of_work, IsolationLevel, SqliteDataSource,
};
use crate::features::relational::mapping::{self, SqlEntity};
use crate::features::relational::pipeline::ConnectionPipeline;
use crate::shared::models::Result;

/// Default rows per multi-row insert statement
pub const DEFAULT_CHUNK_ROWS: usize = 500;

/// Default `find_all` page size
pub const DEFAULT_PAGE_SIZE: usize = 256;

pub struct ConnectionDao<T> {
    data_source: SqliteDataSource,
    pipeline: ConnectionPipeline,
    chunk_rows: usize,
    page_size: usize,
    _entity: PhantomData<fn() -> T>,
}

impl<T: SqlEntity> ConnectionDao<T> {
    pub fn new(data_source: SqliteDataSource, isolation: IsolationLevel) -> Self {
        Self {
            data_source,
            pipeline: ConnectionPipeline::raw_connection(isolation),
            chunk_rows: DEFAULT_CHUNK_ROWS,
            page_size: DEFAULT_PAGE_SIZE,
            _entity: PhantomData,
        }
    }

    pub fn with_pipeline(mut self, pipeline: ConnectionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn pipeline(&self) -> &ConnectionPipeline {
        &self.pipeline
    }

    fn prepared(&self) -> Result<MappedMutexGuard<'_, Connection>> {
        let conn = self.data_source.connection()?;
        self.pipeline.apply(&conn)?;
        Ok(conn)
    }
}

impl<T: SqlEntity> Dao<T> for ConnectionDao<T> {
    fn backend(&self) -> StorageBackend {
        StorageBackend::RawConnection
    }

    fn count(&self) -> Result<usize> {
        mapping::count_rows::<T>(&*self.prepared()?)
    }

    fn find_by(&self, id: &i64) -> Result<Option<T>> {
        mapping::find_by_id(&*self.prepared()?, *id)
    }

    fn find_all(&self) -> Result<RecordSet<T>> {
        let data_source = self.data_source.clone();
        let pipeline = self.pipeline.clone();
        Ok(RecordSet::new(
            move |offset: usize, limit: usize| -> Result<Page<T>> {
                let conn = data_source.connection()?;
                pipeline.apply(&conn)?;
                let rows = mapping::load_page::<T>(&conn, offset, limit)?;
                Ok(Page::from_rows(rows, limit))
            },
            self.page_size,
        ))
    }

    fn save(&self, record: T) -> Result<T> {
        let mut conn = self.prepared()?;
        within_unit_of_work(&mut conn, "raw_save", |conn| {
            if let Some(id) = record.id() {
                if mapping::exists::<T>(conn, id)? {
                    mapping::update(conn, id, &record)?;
                    return Ok(record);
                }
            }
            mapping::insert(conn, record)
        })
    }

    fn exists(&self, id: &i64) -> Result<bool> {
        mapping::exists::<T>(&*self.prepared()?, *id)
    }
}

impl<T: SqlEntity> BatchingDao<T> for ConnectionDao<T> {
    fn batch_insert(&self, records: Vec<T>) -> Result<Vec<T>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let rows = mapping::rows_per_statement::<T>(self.chunk_rows);
        let mut conn = self.prepared()?;
        let stored = within_unit_of_work(&mut conn, "raw_batch_insert", |conn| {
            let mut stored = Vec::with_capacity(records.len());
            for chunk in records.chunks(rows) {
                stored.extend(mapping::insert_rows(conn, chunk)?);
            }
            Ok(stored)
        })?;

        tracing::debug!(
            table = T::TABLE,
            rows = stored.len(),
            statements = records.len().div_ceil(rows),
            "batch inserted"
        );
        Ok(stored)
    }
}
