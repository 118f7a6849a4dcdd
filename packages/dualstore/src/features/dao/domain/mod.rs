//! DAO domain: record model, contract and lazy record sets

pub mod models;
pub mod ports;
pub mod records;

pub use models::{Entity, Gemstone};
pub use ports::{BatchingDao, Dao, StorageBackend};
pub use records::{Page, PageSource, RecordIter, RecordSet};
