//! Configuration
//!
//! ```rust,ignore
//! use dualstore::config::DualStoreConfig;
//!
//! let config = DualStoreConfig::from_yaml("dualstore.yaml")?;
//! let data_source = config.open_data_source()?;
//! ```

pub mod dualstore_config;
pub mod error;

pub use dualstore_config::{
    DualStoreConfig, GridConfig, RelationalBackend, RelationalConfig, TransactionConfig,
    ValidationConfig, SUPPORTED_VERSIONS,
};
pub use error::{ConfigError, ConfigResult};
