//! Data access
//!
//! Hexagonal layout: `domain` holds the record model and the `Dao` /
//! `BatchingDao` ports, `infrastructure` the four backend adapters.

pub mod domain;
pub mod infrastructure;

pub use domain::{BatchingDao, Dao, Entity, Gemstone, Page, PageSource, RecordSet, StorageBackend};
pub use infrastructure::{
    ConnectionDao, KeyGenerator, ManagedContextDao, RegionDao, SequenceKeyGenerator, SessionDao,
};
