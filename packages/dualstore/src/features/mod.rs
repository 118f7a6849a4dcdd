//! Feature modules (vertical slices)
//!
//! Leaves first:
//! - `dao`: record model, DAO contract, batching extension, backend adapters
//! - `relational`: SQLite data source, connection pipeline, ORM session/context
//! - `validation`: business rules applied after the writes
//! - `transaction`: the transaction boundary manager
//! - `service`: the dual-store write coordinator

pub mod dao;
pub mod relational;
pub mod service;
pub mod transaction;
pub mod validation;
