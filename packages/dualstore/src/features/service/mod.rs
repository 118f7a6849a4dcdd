//! Service Coordinator

pub mod coordinator;
pub mod factory;

pub use coordinator::{DualStoreService, SavePhase};
pub use factory::{batching_dao, gemstone_service, relational_dao};
