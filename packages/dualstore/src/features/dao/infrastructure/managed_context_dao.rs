//! ORM-ManagedContext adapter
//!
//! `save` persists a new record or merges an existing one, then flushes
//! explicitly, so the row is on the connection before `save` returns and a
//! read against the other store in the same unit of work can rely on it.

use std::marker::PhantomData;

use super::connection_dao::DEFAULT_PAGE_SIZE;
use crate::features::dao::domain::ports::{Dao, StorageBackend};
use crate::features::dao::domain::records::{Page, RecordSet};
use crate::features::relational::entity_manager::EntityManagerFactory;
use crate::features::relational::mapping::SqlEntity;
use crate::shared::models::Result;

pub struct ManagedContextDao<T> {
    entities: EntityManagerFactory,
    page_size: usize,
    _entity: PhantomData<fn() -> T>,
}

impl<T: SqlEntity> ManagedContextDao<T> {
    pub fn new(entities: EntityManagerFactory) -> Self {
        Self {
            entities,
            page_size: DEFAULT_PAGE_SIZE,
            _entity: PhantomData,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl<T: SqlEntity> Dao<T> for ManagedContextDao<T> {
    fn backend(&self) -> StorageBackend {
        StorageBackend::OrmManagedContext
    }

    fn count(&self) -> Result<usize> {
        self.entities.in_transaction(|em| em.count::<T>())
    }

    fn find_by(&self, id: &i64) -> Result<Option<T>> {
        self.entities.in_transaction(|em| em.find::<T>(*id))
    }

    fn find_all(&self) -> Result<RecordSet<T>> {
        let entities = self.entities.clone();
        Ok(RecordSet::new(
            move |offset: usize, limit: usize| -> Result<Page<T>> {
                entities.in_transaction(|em| Ok(Page::from_rows(em.page::<T>(offset, limit)?, limit)))
            },
            self.page_size,
        ))
    }

    fn save(&self, record: T) -> Result<T> {
        self.entities.in_transaction(|em| {
            let managed = match record.id() {
                Some(id) if em.contains::<T>(id)? => em.merge(record)?,
                _ => em.persist(record)?,
            };
            em.flush()?;
            Ok(managed)
        })
    }
}
