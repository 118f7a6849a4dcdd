//! SQLite Data Source
//!
//! Owns exactly one connection. Adapters built from clones of the same data
//! source share that connection, so a transaction begun on it (by a
//! `TransactionBoundary`) is joined by every adapter operation until it ends.
//!
//! Concurrent callers open separate data sources on the same database file.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::mapping::SqlEntity;
use crate::shared::models::{DaoError, Result};

/// Transaction isolation requested for a connection
///
/// SQLite transactions are serializable; the only knob is whether readers may
/// see uncommitted rows of shared-cache connections. `ReadCommitted` and
/// `Serializable` both turn that off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    Serializable,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "read_uncommitted",
            Self::ReadCommitted => "read_committed",
            Self::Serializable => "serializable",
        }
    }

    /// Value of `PRAGMA read_uncommitted` for this level
    pub fn read_uncommitted(&self) -> bool {
        matches!(self, Self::ReadUncommitted)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection settings applied once, when the data source opens
#[derive(Debug, Clone)]
pub struct DataSourceSettings {
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Use the WAL journal (file databases only)
    pub wal: bool,
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5_000),
            wal: true,
        }
    }
}

/// Single-connection SQLite data source
#[derive(Clone)]
pub struct SqliteDataSource {
    name: Arc<str>,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteDataSource {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, settings: &DataSourceSettings) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(settings.busy_timeout)?;
        if settings.wal {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(path = %path.display(), journal_mode = %mode, "journal mode set");
        }

        tracing::info!(path = %path.display(), "data source opened");
        Ok(Self::from_connection(path.display().to_string(), conn))
    }

    /// Private in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(":memory:", conn))
    }

    /// Wrap an existing connection
    pub fn from_connection(name: impl Into<String>, conn: Connection) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the connection.
    ///
    /// Fails with `Connectivity` once the data source has been closed.
    pub fn connection(&self) -> Result<MappedMutexGuard<'_, Connection>> {
        MutexGuard::try_map(self.conn.lock(), |slot| slot.as_mut()).map_err(|_| {
            DaoError::connectivity(format!("data source {} is closed", self.name))
        })
    }

    /// Close the connection; later acquisitions fail with `Connectivity`
    pub fn close(&self) -> Result<()> {
        let taken = self.conn.lock().take();
        if let Some(conn) = taken {
            conn.close().map_err(|(_, err)| DaoError::from(err))?;
            tracing::info!(data_source = %self.name, "data source closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    /// Whether a transaction is currently open on the connection
    pub fn in_transaction(&self) -> Result<bool> {
        Ok(!self.connection()?.is_autocommit())
    }

    /// Create the entity's table if it does not exist
    pub fn ensure_table<T: SqlEntity>(&self) -> Result<()> {
        self.connection()?.execute_batch(T::DDL)?;
        Ok(())
    }
}

impl fmt::Debug for SqliteDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDataSource")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Run `work` as one failure unit with autocommit off.
///
/// Outside a transaction this is `BEGIN IMMEDIATE … COMMIT`; inside one
/// (e.g. a boundary transaction) it is a named savepoint, so a failure undoes
/// only `work` and leaves the enclosing transaction open. Either way, an error
/// or a panic in `work` rolls its changes back.
pub(crate) fn within_unit_of_work<R>(
    conn: &mut Connection,
    label: &str,
    work: impl FnOnce(&Connection) -> Result<R>,
) -> Result<R> {
    if conn.is_autocommit() {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = work(&tx)?;
        tx.commit()?;
        Ok(out)
    } else {
        let sp = conn.savepoint_with_name(label)?;
        let out = work(&sp)?;
        sp.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ErrorKind;

    #[test]
    fn test_closed_data_source_is_connectivity_error() {
        let ds = SqliteDataSource::in_memory().unwrap();
        assert!(!ds.is_closed());

        ds.close().unwrap();
        assert!(ds.is_closed());

        let err = ds.connection().map(|_| ()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Connectivity);

        // Closing twice is a no-op
        ds.close().unwrap();
    }

    #[test]
    fn test_unit_of_work_commits() {
        let ds = SqliteDataSource::in_memory().unwrap();
        let mut conn = ds.connection().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();

        within_unit_of_work(&mut conn, "t_insert", |c| {
            assert!(!c.is_autocommit());
            c.execute("INSERT INTO t VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();

        assert!(conn.is_autocommit());
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_unit_of_work_inside_transaction_uses_savepoint() {
        let ds = SqliteDataSource::in_memory().unwrap();
        let mut conn = ds.connection().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();

        conn.execute_batch("BEGIN; INSERT INTO t VALUES (1);").unwrap();
        let result: Result<()> = within_unit_of_work(&mut conn, "t_insert", |c| {
            c.execute("INSERT INTO t VALUES (2)", [])?;
            c.execute("INSERT INTO t VALUES (1)", [])?;
            Ok(())
        });
        assert_eq!(result.unwrap_err().kind, ErrorKind::IntegrityViolation);

        // Enclosing transaction still open, row 2 undone, row 1 kept
        assert!(!conn.is_autocommit());
        conn.execute_batch("COMMIT").unwrap();
        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM t")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_isolation_level_pragma_value() {
        assert!(IsolationLevel::ReadUncommitted.read_uncommitted());
        assert!(!IsolationLevel::ReadCommitted.read_uncommitted());
        assert!(!IsolationLevel::Serializable.read_uncommitted());
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }
}
