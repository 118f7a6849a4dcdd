//! dualstore-grid - In-process data grid
//!
//! > "The grid is a collaborator, not the subject."
//!
//! ## Surface
//!
//! 1. **GridCache**: member handle; creates regions and owns the transaction manager
//! 2. **Region**: typed key/value store (`get`/`put`/`remove`/`size`/`key_set`/`get_all`)
//! 3. **CacheTransactionManager**: thread-bound begin/commit/rollback
//!
//! Replication, partitioning and querying are out of scope.
//!
//! ## Usage
//!
//! ```rust
//! use dualstore_grid::GridCache;
//!
//! let cache = GridCache::new("example");
//! let gems = cache.create_region::<i64, String>("Gemstones").unwrap();
//!
//! let tx = cache.transaction_manager();
//! tx.begin().unwrap();
//! gems.put(1, "DIAMOND".to_string()).unwrap();
//! tx.rollback().unwrap();
//!
//! assert_eq!(gems.get(&1).unwrap(), None);
//! ```

pub mod cache;
pub mod error;
pub mod region;
pub mod transaction;

pub use cache::GridCache;
pub use error::{ErrorKind, GridError, Result};
pub use region::Region;
pub use transaction::{CacheTransactionManager, TransactionId};
