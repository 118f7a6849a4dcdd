//! GridRegion adapter
//!
//! `save` is a region `put`. `find_all` takes the key set and bulk-gets the
//! values page by page; regions are never iterated by value. `count` is the
//! region's native `size`.
//!
//! Both `count` and `find_all` read the key set, which the grid refuses while
//! a grid transaction is active on the calling thread. That surfaces as a
//! retryable `TransactionInProgress` error: call them outside a boundary.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dualstore_grid::Region;

use super::connection_dao::DEFAULT_PAGE_SIZE;
use crate::features::dao::domain::models::Entity;
use crate::features::dao::domain::ports::{Dao, StorageBackend};
use crate::features::dao::domain::records::{Page, RecordSet};
use crate::shared::models::Result;

/// Source of region keys for records saved without identity
pub trait KeyGenerator<K>: Send + Sync {
    fn next_key(&self) -> K;

    /// A caller-assigned key was stored
    fn observe(&self, _key: &K) {}
}

/// Monotonic integer keys; never hands out a key it has seen stored
#[derive(Debug)]
pub struct SequenceKeyGenerator {
    next: AtomicI64,
}

impl SequenceKeyGenerator {
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for SequenceKeyGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl KeyGenerator<i64> for SequenceKeyGenerator {
    fn next_key(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    fn observe(&self, key: &i64) {
        self.next.fetch_max(key.saturating_add(1), Ordering::SeqCst);
    }
}

pub struct RegionDao<T: Entity> {
    region: Region<T::Id, T>,
    keys: Arc<dyn KeyGenerator<T::Id>>,
    page_size: usize,
}

impl<T: Entity> RegionDao<T> {
    pub fn new(region: Region<T::Id, T>, keys: Arc<dyn KeyGenerator<T::Id>>) -> Self {
        Self {
            region,
            keys,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn region(&self) -> &Region<T::Id, T> {
        &self.region
    }
}

impl<T: Entity<Id = i64>> RegionDao<T> {
    /// Adapter with integer keys from `SequenceKeyGenerator::starting_at(first)`
    pub fn with_sequence(region: Region<i64, T>, first: i64) -> Self {
        Self::new(region, Arc::new(SequenceKeyGenerator::starting_at(first)))
    }
}

impl<T: Entity> Clone for RegionDao<T> {
    fn clone(&self) -> Self {
        Self {
            region: self.region.clone(),
            keys: Arc::clone(&self.keys),
            page_size: self.page_size,
        }
    }
}

impl<T: Entity> fmt::Debug for RegionDao<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionDao")
            .field("region", &self.region.full_path())
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl<T: Entity> Dao<T> for RegionDao<T> {
    fn backend(&self) -> StorageBackend {
        StorageBackend::GridRegion
    }

    fn count(&self) -> Result<usize> {
        Ok(self.region.size()?)
    }

    fn find_by(&self, id: &T::Id) -> Result<Option<T>> {
        Ok(self.region.get(id)?)
    }

    fn find_all(&self) -> Result<RecordSet<T>> {
        let mut keys = self.region.key_set()?;
        keys.sort();
        let keys = Arc::new(keys);
        let region = self.region.clone();

        Ok(RecordSet::new(
            move |offset: usize, limit: usize| -> Result<Page<T>> {
                let end = (offset + limit).min(keys.len());
                let slice = &keys[offset.min(end)..end];
                let mut values: HashMap<T::Id, T> = region.get_all(slice)?;
                // Entries removed since the key snapshot are skipped
                let records = slice.iter().filter_map(|key| values.remove(key)).collect();
                Ok(Page {
                    records,
                    last: end >= keys.len(),
                })
            },
            self.page_size,
        ))
    }

    fn save(&self, record: T) -> Result<T> {
        let (key, record) = match record.id() {
            Some(id) => {
                self.keys.observe(&id);
                (id, record)
            }
            None => {
                let id = self.keys.next_key();
                (id.clone(), record.with_id(id))
            }
        };

        self.region.put(key, record.clone())?;
        Ok(record)
    }

    fn exists(&self, id: &T::Id) -> Result<bool> {
        Ok(self.region.contains_key(id)?)
    }
}
