//! TransactionBoundary - begin/commit/rollback envelope around a body
//!
//! ```text
//! execute(body)
//!   begin all resources
//!   body(ctx)
//!     Ok            → commit
//!     Err, unchecked → rollback, return the error
//!     Err, checked   → commit, return the error
//!     panic          → rollback while unwinding
//! ```
//!
//! Which errors count as checked is decided by the `RollbackPolicy`.
//! No timeout or cancellation: a hung resource hangs `execute`.

use std::fmt;
use std::sync::Arc;

use super::context::TransactionContext;
use super::policy::RollbackPolicy;
use super::resource::TransactionalResource;
use crate::shared::models::{DaoError, Result};

#[derive(Clone, Default)]
pub struct TransactionBoundary {
    resources: Vec<Arc<dyn TransactionalResource>>,
    policy: RollbackPolicy,
}

impl TransactionBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enlist a resource; resources begin and commit in enlistment order
    pub fn enlist(self, resource: impl TransactionalResource + 'static) -> Self {
        self.enlist_shared(Arc::new(resource))
    }

    pub fn enlist_shared(mut self, resource: Arc<dyn TransactionalResource>) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_policy(mut self, policy: RollbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RollbackPolicy {
        &self.policy
    }

    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name()).collect()
    }

    /// Start a unit of work by hand
    pub fn begin(&self) -> Result<TransactionContext> {
        TransactionContext::begin(self.resources.clone())
    }

    /// Run `body` inside a unit of work over every enlisted resource
    pub fn execute<R>(&self, body: impl FnOnce(&TransactionContext) -> Result<R>) -> Result<R> {
        let ctx = self.begin()?;
        let tx = ctx.id();

        match body(&ctx) {
            Ok(out) => {
                ctx.commit()?;
                Ok(out)
            }
            Err(err) if self.policy.rolls_back(&err) => {
                tracing::debug!(%tx, kind = %err.kind, "body failed, rolling back");
                if let Err(rollback_err) = ctx.rollback() {
                    tracing::warn!(%tx, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
            Err(err) => {
                tracing::debug!(%tx, kind = %err.kind, "checked failure, committing");
                if let Err(commit_err) = ctx.commit() {
                    tracing::warn!(%tx, error = %err, "commit after checked failure failed");
                    let message = format!("{}; body had failed with {}", commit_err.message, err);
                    return Err(DaoError::new(commit_err.kind, message).with_source(commit_err));
                }
                Err(err)
            }
        }
    }
}

impl fmt::Debug for TransactionBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionBoundary")
            .field("resources", &self.resource_names())
            .field("policy", &self.policy)
            .finish()
    }
}
