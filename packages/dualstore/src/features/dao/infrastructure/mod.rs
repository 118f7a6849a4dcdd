//! DAO adapters, one per backend

pub mod connection_dao;
pub mod managed_context_dao;
pub mod region_dao;
pub mod session_dao;

pub use connection_dao::ConnectionDao;
pub use managed_context_dao::ManagedContextDao;
pub use region_dao::{KeyGenerator, RegionDao, SequenceKeyGenerator};
pub use session_dao::SessionDao;
