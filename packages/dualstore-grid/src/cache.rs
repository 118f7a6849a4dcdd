//! GridCache - the member-level handle regions are created from
//!
//! The cache is an explicit value handed to whoever needs it; there is no
//! process-wide "current" cache.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashSet;

use crate::error::{GridError, Result};
use crate::region::Region;
use crate::transaction::CacheTransactionManager;

struct CacheInner {
    name: String,
    closed: Arc<AtomicBool>,
    regions: DashSet<String>,
    tx_manager: CacheTransactionManager,
}

#[derive(Clone)]
pub struct GridCache {
    inner: Arc<CacheInner>,
}

impl GridCache {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let closed = Arc::new(AtomicBool::new(false));
        let tx_manager = CacheTransactionManager::new(name.clone(), closed.clone());
        Self {
            inner: Arc::new(CacheInner {
                name,
                closed,
                regions: DashSet::new(),
                tx_manager,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Create a new region; names are unique per cache
    pub fn create_region<K, V>(&self, name: impl Into<String>) -> Result<Region<K, V>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(GridError::cache_closed(&self.inner.name));
        }

        let name = name.into();
        if !self.inner.regions.insert(name.clone()) {
            return Err(GridError::region_exists(name));
        }

        tracing::info!(cache = %self.inner.name, region = %name, "region created");
        Ok(Region::new(
            name,
            self.inner.name.clone(),
            self.inner.closed.clone(),
            self.inner.tx_manager.clone(),
        ))
    }

    pub fn region_names(&self) -> Vec<String> {
        self.inner.regions.iter().map(|name| name.key().clone()).collect()
    }

    pub fn transaction_manager(&self) -> CacheTransactionManager {
        self.inner.tx_manager.clone()
    }

    /// Close the cache; every region operation fails afterwards
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(cache = %self.inner.name, "cache closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for GridCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridCache")
            .field("name", &self.inner.name)
            .field("regions", &self.inner.regions.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_create_region() {
        let cache = GridCache::new("test");
        let region = cache.create_region::<i64, String>("Gemstones").unwrap();
        assert_eq!(region.name(), "Gemstones");
        assert_eq!(region.full_path(), "/Gemstones");
        assert_eq!(cache.region_names(), vec!["Gemstones".to_string()]);
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let cache = GridCache::new("test");
        cache.create_region::<i64, String>("Gemstones").unwrap();
        let err = cache.create_region::<i64, String>("Gemstones").unwrap_err();
        assert_eq!(err.kind, ErrorKind::RegionExists);
    }

    #[test]
    fn test_close_propagates_to_regions() {
        let cache = GridCache::new("test");
        let region = cache.create_region::<i64, String>("Gemstones").unwrap();
        cache.close();

        assert!(cache.is_closed());
        assert_eq!(region.size().unwrap_err().kind, ErrorKind::CacheClosed);
        assert_eq!(
            cache.transaction_manager().begin().unwrap_err().kind,
            ErrorKind::CacheClosed
        );
    }
}
