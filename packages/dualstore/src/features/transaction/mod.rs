//! Transaction Boundary Manager
//!
//! - `resource`: the `TransactionalResource` seam (SQLite data source, grid)
//! - `context`: one unit of work and its state machine
//! - `policy`: which failures roll back
//! - `boundary`: the begin/execute/commit-or-rollback envelope

pub mod boundary;
pub mod context;
pub mod policy;
pub mod resource;

pub use boundary::TransactionBoundary;
pub use context::{TransactionContext, TransactionState};
pub use policy::RollbackPolicy;
pub use resource::{GridTransactionResource, TransactionalResource};
