//! Region - typed key/value partition of a cache
//!
//! # Operations
//!
//! | Operation   | In transaction                     |
//! |-------------|------------------------------------|
//! | get         | allowed                            |
//! | put/remove  | allowed (undo recorded)            |
//! | contains_key| allowed                            |
//! | get_all     | allowed                            |
//! | size        | rejected (`UnsupportedInTransaction`) |
//! | key_set     | rejected (`UnsupportedInTransaction`) |
//!
//! There is no value iterator: bulk reads go through
//! `key_set` followed by `get_all`.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::error::{GridError, Result};
use crate::transaction::CacheTransactionManager;

/// Key sets at least this large are fetched in parallel by `get_all`
pub const PARALLEL_GET_ALL_THRESHOLD: usize = 1024;

struct RegionInner<K, V> {
    name: String,
    cache_name: String,
    entries: Arc<DashMap<K, V>>,
    closed: Arc<AtomicBool>,
    tx_manager: CacheTransactionManager,
}

/// Handle to a region; clones share the same entries
pub struct Region<K, V> {
    inner: Arc<RegionInner<K, V>>,
}

impl<K, V> Clone for Region<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Region<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        name: impl Into<String>,
        cache_name: impl Into<String>,
        closed: Arc<AtomicBool>,
        tx_manager: CacheTransactionManager,
    ) -> Self {
        Self {
            inner: Arc::new(RegionInner {
                name: name.into(),
                cache_name: cache_name.into(),
                entries: Arc::new(DashMap::new()),
                closed,
                tx_manager,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Full path of the region, e.g. `/Gemstones`
    pub fn full_path(&self) -> String {
        format!("/{}", self.inner.name)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(GridError::cache_closed(&self.inner.cache_name));
        }
        Ok(())
    }

    fn ensure_no_transaction(&self, operation: &str) -> Result<()> {
        if self.inner.tx_manager.exists() {
            return Err(GridError::unsupported_in_transaction(format!(
                "Region::{} on {}",
                operation,
                self.full_path()
            )));
        }
        Ok(())
    }

    pub fn get(&self, key: &K) -> Result<Option<V>> {
        self.ensure_open()?;
        Ok(self.inner.entries.get(key).map(|entry| entry.value().clone()))
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.inner.entries.contains_key(key))
    }

    /// Store `value` under `key`, returning the previous value
    pub fn put(&self, key: K, value: V) -> Result<Option<V>> {
        self.ensure_open()?;

        let previous = self.inner.entries.insert(key.clone(), value);

        if self.inner.tx_manager.exists() {
            let entries = Arc::clone(&self.inner.entries);
            let restore = previous.clone();
            self.inner.tx_manager.record_undo(Box::new(move || match restore {
                Some(old) => {
                    entries.insert(key, old);
                }
                None => {
                    entries.remove(&key);
                }
            }));
        }

        Ok(previous)
    }

    /// Remove `key`, returning the removed value
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        self.ensure_open()?;

        let removed = self.inner.entries.remove(key).map(|(_, value)| value);

        if let Some(old) = removed.clone() {
            if self.inner.tx_manager.exists() {
                let entries = Arc::clone(&self.inner.entries);
                let key = key.clone();
                self.inner.tx_manager.record_undo(Box::new(move || {
                    entries.insert(key, old);
                }));
            }
        }

        Ok(removed)
    }

    /// Number of entries
    pub fn size(&self) -> Result<usize> {
        self.ensure_open()?;
        self.ensure_no_transaction("size")?;
        Ok(self.inner.entries.len())
    }

    /// Snapshot of all keys
    pub fn key_set(&self) -> Result<Vec<K>> {
        self.ensure_open()?;
        self.ensure_no_transaction("keySet")?;
        Ok(self
            .inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    /// Bulk get; keys without an entry are absent from the result
    pub fn get_all(&self, keys: &[K]) -> Result<HashMap<K, V>> {
        self.ensure_open()?;

        let entries = &self.inner.entries;
        let found: HashMap<K, V> = if keys.len() >= PARALLEL_GET_ALL_THRESHOLD {
            keys.par_iter()
                .filter_map(|key| entries.get(key).map(|v| (key.clone(), v.value().clone())))
                .collect()
        } else {
            keys.iter()
                .filter_map(|key| entries.get(key).map(|v| (key.clone(), v.value().clone())))
                .collect()
        };
        Ok(found)
    }
}

impl<K, V> fmt::Debug for Region<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.inner.name)
            .field("cache", &self.inner.cache_name)
            .finish()
    }
}
