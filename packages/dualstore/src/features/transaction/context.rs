//! TransactionContext - one logical unit of work across enlisted resources
//!
//! State machine: `Active` → exactly one of `Committed` | `RolledBack`.
//! `commit` and `rollback` consume the context; dropping a context that is
//! still `Active` (a panic unwinding through the body, for instance) rolls it
//! back.
//!
//! There is no two-phase commit. Resources commit one after another in
//! enlistment order; if one fails after an earlier one committed, the outcome
//! is mixed and the error says so.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::resource::TransactionalResource;
use crate::shared::models::{DaoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

pub struct TransactionContext {
    id: Uuid,
    state: TransactionState,
    resources: Vec<Arc<dyn TransactionalResource>>,
}

impl TransactionContext {
    /// Begin every resource in order.
    ///
    /// If one fails, the resources already begun are rolled back and that
    /// failure is returned.
    pub fn begin(resources: Vec<Arc<dyn TransactionalResource>>) -> Result<Self> {
        let id = Uuid::new_v4();

        for (i, resource) in resources.iter().enumerate() {
            if let Err(err) = resource.begin() {
                tracing::warn!(tx = %id, resource = resource.name(), error = %err, "begin failed");
                for begun in resources[..i].iter().rev() {
                    if let Err(rollback_err) = begun.rollback() {
                        tracing::warn!(
                            tx = %id,
                            resource = begun.name(),
                            error = %rollback_err,
                            "rollback after failed begin failed"
                        );
                    }
                }
                return Err(err);
            }
        }

        let ctx = Self {
            id,
            state: TransactionState::Active,
            resources,
        };
        tracing::debug!(tx = %ctx.id, resources = ?ctx.resource_names(), "transaction begun");
        Ok(ctx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name()).collect()
    }

    pub fn commit(mut self) -> Result<()> {
        for i in 0..self.resources.len() {
            let resource = Arc::clone(&self.resources[i]);
            if let Err(err) = resource.commit() {
                let committed: Vec<String> = self.resources[..i]
                    .iter()
                    .map(|r| r.name().to_string())
                    .collect();
                self.rollback_from(i);
                self.state = TransactionState::RolledBack;

                let message = if committed.is_empty() {
                    format!(
                        "commit of {} failed; transaction {} rolled back",
                        resource.name(),
                        self.id
                    )
                } else {
                    format!(
                        "commit of {} failed after {} committed; transaction {} has a mixed outcome",
                        resource.name(),
                        committed.join(", "),
                        self.id
                    )
                };
                tracing::warn!(tx = %self.id, error = %err, "{}", message);
                return Err(DaoError::transaction(message).with_source(err));
            }
        }

        self.state = TransactionState::Committed;
        tracing::debug!(tx = %self.id, "transaction committed");
        Ok(())
    }

    /// Roll back every resource, newest first.
    ///
    /// All resources are attempted; the first failure is returned.
    pub fn rollback(mut self) -> Result<()> {
        let first_failure = self.rollback_from(0);
        self.state = TransactionState::RolledBack;
        tracing::debug!(tx = %self.id, "transaction rolled back");
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Roll back `resources[start..]` in reverse order
    fn rollback_from(&mut self, start: usize) -> Option<DaoError> {
        let mut first_failure = None;
        for resource in self.resources[start..].iter().rev() {
            if let Err(err) = resource.rollback() {
                tracing::warn!(
                    tx = %self.id,
                    resource = resource.name(),
                    error = %err,
                    "rollback failed"
                );
                first_failure.get_or_insert(err);
            }
        }
        first_failure
    }
}

impl Drop for TransactionContext {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            tracing::warn!(
                tx = %self.id,
                panicking = std::thread::panicking(),
                "transaction dropped while active, rolling back"
            );
            self.rollback_from(0);
            self.state = TransactionState::RolledBack;
        }
    }
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContext")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("resources", &self.resource_names())
            .finish()
    }
}
