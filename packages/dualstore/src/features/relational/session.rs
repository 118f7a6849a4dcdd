//! ORM session
//!
//! A `Session` is a short-lived view of the data source's connection with
//! explicit `begin`/`commit`/`rollback`. If a transaction is already open on
//! the connection when `begin` is called, the session joins it and leaves the
//! final decision to whoever opened it.
//!
//! Dropping a session closes it; an owned transaction still open at that point
//! is rolled back.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::MappedMutexGuard;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::datasource::{within_unit_of_work, SqliteDataSource};
use super::mapping::{self, SqlEntity};
use super::pipeline::ConnectionPipeline;
use crate::shared::models::{DaoError, Result};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTx {
    None,
    /// Opened by this session with `BEGIN IMMEDIATE`
    Owned,
    /// An enclosing transaction was already open on the connection
    Joined,
}

/// Hands out sessions bound to one data source
#[derive(Debug, Clone)]
pub struct SessionFactory {
    data_source: SqliteDataSource,
    pipeline: ConnectionPipeline,
}

impl SessionFactory {
    pub fn new(data_source: SqliteDataSource, pipeline: ConnectionPipeline) -> Self {
        Self {
            data_source,
            pipeline,
        }
    }

    pub fn data_source(&self) -> &SqliteDataSource {
        &self.data_source
    }

    pub fn pipeline(&self) -> &ConnectionPipeline {
        &self.pipeline
    }

    /// Acquire the connection and run the preparation pipeline on it
    pub fn open_session(&self) -> Result<Session<'_>> {
        let conn = self.data_source.connection()?;
        self.pipeline.apply(&conn)?;
        Ok(Session::new(conn))
    }

    /// Run `work` in a fresh session and transaction.
    ///
    /// Commits on `Ok`, rolls back on `Err`; the session is closed on every
    /// path, unwinding included.
    pub fn in_session<R>(&self, work: impl FnOnce(&mut Session<'_>) -> Result<R>) -> Result<R> {
        let mut session = self.open_session()?;
        session.begin()?;
        match work(&mut session) {
            Ok(out) => {
                session.commit()?;
                Ok(out)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback() {
                    tracing::warn!(
                        session = session.id,
                        error = %rollback_err,
                        "session rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

pub struct Session<'a> {
    id: u64,
    conn: MappedMutexGuard<'a, Connection>,
    tx: SessionTx,
}

impl<'a> Session<'a> {
    fn new(conn: MappedMutexGuard<'a, Connection>) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(session = id, "session opened");
        Self {
            id,
            conn,
            tx: SessionTx::None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.tx != SessionTx::None
    }

    /// Whether this session joined a transaction it did not open
    pub fn is_joined(&self) -> bool {
        self.tx == SessionTx::Joined
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(DaoError::transaction(format!(
                "session {} already has an active transaction",
                self.id
            )));
        }

        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
            self.tx = SessionTx::Owned;
        } else {
            self.tx = SessionTx::Joined;
        }
        tracing::trace!(session = self.id, tx = ?self.tx, "session transaction begun");
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.tx, SessionTx::None) {
            SessionTx::Owned => self.conn.execute_batch("COMMIT")?,
            SessionTx::Joined => {}
            SessionTx::None => {
                return Err(DaoError::transaction(format!(
                    "session {} has no active transaction to commit",
                    self.id
                )))
            }
        }
        Ok(())
    }

    /// Roll back an owned transaction. A joined one is left to its owner.
    pub fn rollback(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.tx, SessionTx::None) == SessionTx::Owned {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    pub fn get<T: SqlEntity>(&self, id: i64) -> Result<Option<T>> {
        mapping::find_by_id(&self.conn, id)
    }

    pub fn contains<T: SqlEntity>(&self, id: i64) -> Result<bool> {
        mapping::exists::<T>(&self.conn, id)
    }

    pub fn count<T: SqlEntity>(&self) -> Result<usize> {
        mapping::count_rows::<T>(&self.conn)
    }

    pub fn page<T: SqlEntity>(&self, offset: usize, limit: usize) -> Result<Vec<T>> {
        mapping::load_page(&self.conn, offset, limit)
    }

    pub fn insert<T: SqlEntity>(&self, record: T) -> Result<T> {
        mapping::insert(&self.conn, record)
    }

    /// Insert when the record has no identity, native upsert otherwise
    pub fn save_or_update<T: SqlEntity>(&self, record: T) -> Result<T> {
        if record.id().is_some() {
            mapping::upsert(&self.conn, &record)?;
            Ok(record)
        } else {
            mapping::insert(&self.conn, record)
        }
    }

    /// Session-level batched save: multi-row inserts of `chunk_rows` rows,
    /// all or nothing
    pub fn save_all<T: SqlEntity>(&mut self, records: &[T], chunk_rows: usize) -> Result<Vec<T>> {
        let rows = mapping::rows_per_statement::<T>(chunk_rows);
        let id = self.id;
        within_unit_of_work(&mut self.conn, "session_save_all", |conn| {
            let mut stored = Vec::with_capacity(records.len());
            for chunk in records.chunks(rows) {
                stored.extend(mapping::insert_rows(conn, chunk)?);
            }
            tracing::debug!(session = id, rows = stored.len(), "batch saved");
            Ok(stored)
        })
    }

    pub fn execute(&self, sql: &str, params: Vec<Value>) -> Result<usize> {
        Ok(self.conn.execute(sql, params_from_iter(params))?)
    }

    /// Close the session; same as dropping it
    pub fn close(self) {}
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.tx == SessionTx::Owned {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(session = self.id, error = %err, "rollback on close failed");
            } else {
                tracing::debug!(session = self.id, "open transaction rolled back on close");
            }
        }
        tracing::trace!(session = self.id, "session closed");
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("tx", &self.tx)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dao::domain::models::Gemstone;
    use crate::features::relational::datasource::IsolationLevel;
    use crate::shared::models::ErrorKind;

    fn factory() -> SessionFactory {
        let ds = SqliteDataSource::in_memory().unwrap();
        ds.ensure_table::<Gemstone>().unwrap();
        SessionFactory::new(ds, ConnectionPipeline::session(IsolationLevel::ReadCommitted))
    }

    #[test]
    fn test_in_session_commits() {
        let sessions = factory();
        let saved = sessions
            .in_session(|s| s.save_or_update(Gemstone::new("RUBY")))
            .unwrap();

        let found = sessions
            .in_session(|s| s.get::<Gemstone>(saved.id.unwrap()))
            .unwrap();
        assert_eq!(found, Some(saved));
    }

    #[test]
    fn test_in_session_rolls_back_on_error() {
        let sessions = factory();
        let result: Result<()> = sessions.in_session(|s| {
            s.save_or_update(Gemstone::new("RUBY"))?;
            Err(DaoError::validation("rejected"))
        });
        assert!(result.unwrap_err().is_validation());

        let count = sessions.in_session(|s| s.count::<Gemstone>()).unwrap();
        assert_eq!(count, 0);
        // Connection is back in autocommit: the session closed cleanly
        assert!(!sessions.data_source().in_transaction().unwrap());
    }

    #[test]
    fn test_drop_rolls_back_owned_transaction() {
        let sessions = factory();
        {
            let mut session = sessions.open_session().unwrap();
            session.begin().unwrap();
            session.save_or_update(Gemstone::new("OPAL")).unwrap();
        }
        assert_eq!(sessions.in_session(|s| s.count::<Gemstone>()).unwrap(), 0);
    }

    #[test]
    fn test_session_joins_enclosing_transaction() {
        let sessions = factory();
        sessions
            .data_source()
            .connection()
            .unwrap()
            .execute_batch("BEGIN")
            .unwrap();

        sessions
            .in_session(|s| {
                assert!(s.is_joined());
                s.save_or_update(Gemstone::new("PEARL"))
            })
            .unwrap();

        // Still inside the enclosing transaction; undoing it removes the row
        assert!(sessions.data_source().in_transaction().unwrap());
        sessions
            .data_source()
            .connection()
            .unwrap()
            .execute_batch("ROLLBACK")
            .unwrap();
        assert_eq!(sessions.in_session(|s| s.count::<Gemstone>()).unwrap(), 0);
    }

    #[test]
    fn test_double_begin_and_bare_commit_fail() {
        let sessions = factory();
        let mut session = sessions.open_session().unwrap();
        assert_eq!(session.commit().unwrap_err().kind, ErrorKind::Transaction);
        session.begin().unwrap();
        assert_eq!(session.begin().unwrap_err().kind, ErrorKind::Transaction);
        session.rollback().unwrap();
        session.close();
    }

    #[test]
    fn test_save_all_is_one_failure_unit() {
        let sessions = factory();
        let result = sessions.in_session(|s| {
            s.save_all(
                &[
                    Gemstone::with_identity(1, "RUBY"),
                    Gemstone::with_identity(2, "OPAL"),
                    Gemstone::with_identity(1, "TOPAZ"),
                ],
                2,
            )
        });
        assert!(result.unwrap_err().is_integrity_violation());
        assert_eq!(sessions.in_session(|s| s.count::<Gemstone>()).unwrap(), 0);
    }
}
