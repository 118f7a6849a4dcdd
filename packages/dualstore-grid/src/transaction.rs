//! Thread-bound grid transactions
//!
//! A grid transaction belongs to the thread that began it. Region writes made
//! while it is active are applied to the shared entries immediately and an undo
//! action is recorded; `rollback` replays the undo log in reverse, `commit`
//! discards it.
//!
//! Writes are therefore visible to other threads before the transaction ends.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;

use crate::error::{GridError, Result};

/// Identifier of a grid transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid-tx-{}", self.0)
    }
}

pub(crate) type UndoAction = Box<dyn FnOnce() + Send + Sync>;

struct TxState {
    id: TransactionId,
    undo: Vec<UndoAction>,
}

struct ManagerInner {
    cache_name: String,
    closed: Arc<AtomicBool>,
    active: DashMap<ThreadId, TxState>,
    next_id: AtomicU64,
}

/// Transaction manager of one cache
///
/// Cheap to clone; all clones share the same per-thread transaction table.
#[derive(Clone)]
pub struct CacheTransactionManager {
    inner: Arc<ManagerInner>,
}

impl CacheTransactionManager {
    pub(crate) fn new(cache_name: impl Into<String>, closed: Arc<AtomicBool>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                cache_name: cache_name.into(),
                closed,
                active: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Begin a transaction on the calling thread
    pub fn begin(&self) -> Result<TransactionId> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(GridError::cache_closed(&self.inner.cache_name));
        }

        let current = thread::current().id();
        if let Some(state) = self.inner.active.get(&current) {
            return Err(GridError::illegal_transaction_state(format!(
                "transaction {} is already active on this thread",
                state.id
            )));
        }

        let id = TransactionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.active.insert(
            current,
            TxState {
                id,
                undo: Vec::new(),
            },
        );
        tracing::debug!(tx = %id, "grid transaction begun");
        Ok(id)
    }

    /// Commit the calling thread's transaction
    pub fn commit(&self) -> Result<()> {
        let (_, state) = self
            .inner
            .active
            .remove(&thread::current().id())
            .ok_or_else(|| {
                GridError::illegal_transaction_state("commit called with no active transaction")
            })?;

        tracing::debug!(tx = %state.id, writes = state.undo.len(), "grid transaction committed");
        Ok(())
    }

    /// Roll back the calling thread's transaction
    ///
    /// Undo actions run outside the transaction table lock, newest first.
    pub fn rollback(&self) -> Result<()> {
        let (_, state) = self
            .inner
            .active
            .remove(&thread::current().id())
            .ok_or_else(|| {
                GridError::illegal_transaction_state("rollback called with no active transaction")
            })?;

        let writes = state.undo.len();
        for undo in state.undo.into_iter().rev() {
            undo();
        }
        tracing::debug!(tx = %state.id, writes, "grid transaction rolled back");
        Ok(())
    }

    /// Whether the calling thread has an active transaction
    pub fn exists(&self) -> bool {
        self.inner.active.contains_key(&thread::current().id())
    }

    /// Id of the calling thread's transaction, if any
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.inner
            .active
            .get(&thread::current().id())
            .map(|state| state.id)
    }

    /// Record an undo action for the calling thread's transaction.
    ///
    /// Returns `false` (and drops the action) when no transaction is active.
    pub(crate) fn record_undo(&self, undo: UndoAction) -> bool {
        match self.inner.active.get_mut(&thread::current().id()) {
            Some(mut state) => {
                state.undo.push(undo);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CacheTransactionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTransactionManager")
            .field("cache", &self.inner.cache_name)
            .field("active", &self.inner.active.len())
            .finish()
    }
}
