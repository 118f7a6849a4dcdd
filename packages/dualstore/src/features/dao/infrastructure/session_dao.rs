//! ORM-Session adapter
//!
//! One session per operation. The session factory's pipeline forces the
//! isolation level straight after the connection is acquired; the session is
//! closed on every exit path.

use std::marker::PhantomData;

use super::connection_dao::{DEFAULT_CHUNK_ROWS, DEFAULT_PAGE_SIZE};
use crate::features::dao::domain::ports::{BatchingDao, Dao, StorageBackend};
use crate::features::dao::domain::records::{Page, RecordSet};
use crate::features::relational::mapping::SqlEntity;
use crate::features::relational::session::SessionFactory;
use crate::shared::models::Result;

pub struct SessionDao<T> {
    sessions: SessionFactory,
    chunk_rows: usize,
    page_size: usize,
    _entity: PhantomData<fn() -> T>,
}

impl<T: SqlEntity> SessionDao<T> {
    pub fn new(sessions: SessionFactory) -> Self {
        Self {
            sessions,
            chunk_rows: DEFAULT_CHUNK_ROWS,
            page_size: DEFAULT_PAGE_SIZE,
            _entity: PhantomData,
        }
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl<T: SqlEntity> Dao<T> for SessionDao<T> {
    fn backend(&self) -> StorageBackend {
        StorageBackend::OrmSession
    }

    fn count(&self) -> Result<usize> {
        self.sessions.in_session(|s| s.count::<T>())
    }

    fn find_by(&self, id: &i64) -> Result<Option<T>> {
        self.sessions.in_session(|s| s.get::<T>(*id))
    }

    fn find_all(&self) -> Result<RecordSet<T>> {
        let sessions = self.sessions.clone();
        Ok(RecordSet::new(
            move |offset: usize, limit: usize| -> Result<Page<T>> {
                sessions.in_session(|s| Ok(Page::from_rows(s.page::<T>(offset, limit)?, limit)))
            },
            self.page_size,
        ))
    }

    fn save(&self, record: T) -> Result<T> {
        self.sessions.in_session(|s| s.save_or_update(record))
    }

    fn exists(&self, id: &i64) -> Result<bool> {
        self.sessions.in_session(|s| s.contains::<T>(*id))
    }
}

impl<T: SqlEntity> BatchingDao<T> for SessionDao<T> {
    fn batch_insert(&self, records: Vec<T>) -> Result<Vec<T>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let chunk_rows = self.chunk_rows;
        self.sessions.in_session(|s| s.save_all(&records, chunk_rows))
    }
}
