//! Managed persistence context
//!
//! `persist` and `merge` queue their statements; `flush` writes the queue to
//! the connection. Reads flush first, so a query always sees the context's own
//! pending changes. A record persisted without an identity is inserted at once
//! because its identity comes from the table.

use rusqlite::types::Value;

use super::mapping::{self, SqlEntity};
use super::session::{Session, SessionFactory};
use crate::shared::models::Result;

#[derive(Debug, Clone)]
struct PendingWrite {
    description: String,
    sql: String,
    params: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct EntityManagerFactory {
    sessions: SessionFactory,
}

impl EntityManagerFactory {
    pub fn new(sessions: SessionFactory) -> Self {
        Self { sessions }
    }

    pub fn create_entity_manager(&self) -> Result<EntityManager<'_>> {
        Ok(EntityManager {
            session: self.sessions.open_session()?,
            pending: Vec::new(),
        })
    }

    /// Run `work` in a managed transaction: flush and commit on `Ok`,
    /// discard and roll back on `Err`
    pub fn in_transaction<R>(
        &self,
        work: impl FnOnce(&mut EntityManager<'_>) -> Result<R>,
    ) -> Result<R> {
        let mut em = self.create_entity_manager()?;
        em.begin()?;
        match work(&mut em) {
            Ok(out) => {
                em.commit()?;
                Ok(out)
            }
            Err(err) => {
                if let Err(rollback_err) = em.rollback() {
                    tracing::warn!(error = %rollback_err, "entity manager rollback failed");
                }
                Err(err)
            }
        }
    }
}

pub struct EntityManager<'a> {
    session: Session<'a>,
    pending: Vec<PendingWrite>,
}

impl EntityManager<'_> {
    pub fn begin(&mut self) -> Result<()> {
        self.session.begin()
    }

    /// Make a new record managed
    pub fn persist<T: SqlEntity>(&mut self, record: T) -> Result<T> {
        match record.id() {
            None => {
                self.flush()?;
                self.session.insert(record)
            }
            Some(id) => {
                let (sql, params) = mapping::insert_statement(&record);
                self.queue(format!("persist {}#{}", T::TABLE, id), sql, params);
                Ok(record)
            }
        }
    }

    /// Copy the record's state onto the stored row (creating it if missing)
    pub fn merge<T: SqlEntity>(&mut self, record: T) -> Result<T> {
        match record.id() {
            None => self.persist(record),
            Some(id) => {
                let (sql, params) = mapping::upsert_statement(&record)?;
                self.queue(format!("merge {}#{}", T::TABLE, id), sql, params);
                Ok(record)
            }
        }
    }

    pub fn contains<T: SqlEntity>(&mut self, id: i64) -> Result<bool> {
        self.flush()?;
        self.session.contains::<T>(id)
    }

    pub fn find<T: SqlEntity>(&mut self, id: i64) -> Result<Option<T>> {
        self.flush()?;
        self.session.get(id)
    }

    pub fn count<T: SqlEntity>(&mut self) -> Result<usize> {
        self.flush()?;
        self.session.count::<T>()
    }

    pub fn page<T: SqlEntity>(&mut self, offset: usize, limit: usize) -> Result<Vec<T>> {
        self.flush()?;
        self.session.page(offset, limit)
    }

    /// Write every queued change, oldest first
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let writes = std::mem::take(&mut self.pending);
        let n = writes.len();
        for write in writes {
            tracing::trace!(session = self.session.id(), write = %write.description, "flush");
            self.session.execute(&write.sql, write.params)?;
        }
        tracing::debug!(session = self.session.id(), writes = n, "context flushed");
        Ok(())
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.flush()?;
        self.session.commit()
    }

    /// Drop queued changes and roll back
    pub fn rollback(&mut self) -> Result<()> {
        self.pending.clear();
        self.session.rollback()
    }

    fn queue(&mut self, description: String, sql: String, params: Vec<Value>) {
        self.pending.push(PendingWrite {
            description,
            sql,
            params,
        });
    }
}
