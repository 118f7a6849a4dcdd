//! Entity ↔ table mapping
//!
//! `SqlEntity` describes how a record maps onto one table whose primary key
//! is an `INTEGER PRIMARY KEY` rowid alias. The free functions below build
//! and run the statements every relational adapter shares.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

use crate::features::dao::domain::models::{Entity, Gemstone};
use crate::shared::models::{DaoError, Result};

/// SQLite's default cap on bound parameters per statement
pub const MAX_BOUND_PARAMETERS: usize = 32_766;

/// Table mapping of a record with an integer identity
pub trait SqlEntity: Entity<Id = i64> {
    const TABLE: &'static str;
    const ID_COLUMN: &'static str = "id";
    /// Non-identity columns, in the order `values` returns them
    const COLUMNS: &'static [&'static str];
    /// `CREATE TABLE IF NOT EXISTS …`
    const DDL: &'static str;

    fn values(&self) -> Vec<Value>;

    /// Build a record from a row laid out as `id, COLUMNS…`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl SqlEntity for Gemstone {
    const TABLE: &'static str = "gemstones";
    const COLUMNS: &'static [&'static str] = &["name"];
    const DDL: &'static str =
        "CREATE TABLE IF NOT EXISTS gemstones (id INTEGER PRIMARY KEY, name TEXT NOT NULL)";

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Gemstone::with_identity(row.get(0)?, row.get::<_, String>(1)?))
    }
}

fn select_list<T: SqlEntity>() -> String {
    std::iter::once(T::ID_COLUMN)
        .chain(T::COLUMNS.iter().copied())
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(n: usize) -> String {
    format!("({})", vec!["?"; n].join(", "))
}

fn id_value<T: SqlEntity>(record: &T) -> Value {
    match record.id() {
        Some(id) => Value::Integer(id),
        None => Value::Null,
    }
}

/// Rows that fit into one multi-row statement
pub fn rows_per_statement<T: SqlEntity>(requested: usize) -> usize {
    let per_row = T::COLUMNS.len() + 1;
    requested.clamp(1, (MAX_BOUND_PARAMETERS / per_row).max(1))
}

pub fn find_by_id<T: SqlEntity>(conn: &Connection, id: i64) -> Result<Option<T>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        select_list::<T>(),
        T::TABLE,
        T::ID_COLUMN
    );
    Ok(conn.query_row(&sql, [id], T::from_row).optional()?)
}

pub fn exists<T: SqlEntity>(conn: &Connection, id: i64) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
        T::TABLE,
        T::ID_COLUMN
    );
    Ok(conn.query_row(&sql, [id], |row| row.get(0))?)
}

pub fn count_rows<T: SqlEntity>(conn: &Connection) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", T::TABLE);
    let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    usize::try_from(n).map_err(|_| DaoError::internal(format!("negative row count {}", n)))
}

/// `INSERT` statement and parameters for one record.
///
/// A record without identity binds `NULL` for the key, which makes SQLite
/// assign the next rowid.
pub fn insert_statement<T: SqlEntity>(record: &T) -> (String, Vec<Value>) {
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        T::TABLE,
        select_list::<T>(),
        placeholders(T::COLUMNS.len() + 1)
    );
    let mut params = Vec::with_capacity(T::COLUMNS.len() + 1);
    params.push(id_value(record));
    params.extend(record.values());
    (sql, params)
}

/// Native upsert on the identity column; the record must carry an identity
pub fn upsert_statement<T: SqlEntity>(record: &T) -> Result<(String, Vec<Value>)> {
    if record.id().is_none() {
        return Err(DaoError::internal(format!(
            "upsert into {} requires an identity",
            T::TABLE
        )));
    }

    let (insert, params) = insert_statement(record);
    let assignments = T::COLUMNS
        .iter()
        .map(|col| format!("{col} = excluded.{col}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "{} ON CONFLICT({}) DO UPDATE SET {}",
        insert,
        T::ID_COLUMN,
        assignments
    );
    Ok((sql, params))
}

/// Insert one record and return it with its identity
pub fn insert<T: SqlEntity>(conn: &Connection, record: T) -> Result<T> {
    let (sql, params) = insert_statement(&record);
    conn.execute(&sql, params_from_iter(params))?;
    match record.id() {
        Some(_) => Ok(record),
        None => {
            let id = conn.last_insert_rowid();
            Ok(record.with_id(id))
        }
    }
}

/// Update the non-identity columns of an existing row; returns rows changed
pub fn update<T: SqlEntity>(conn: &Connection, id: i64, record: &T) -> Result<usize> {
    let assignments = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ?{}", col, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        T::TABLE,
        assignments,
        T::ID_COLUMN,
        T::COLUMNS.len() + 1
    );
    let mut params = record.values();
    params.push(Value::Integer(id));
    Ok(conn.execute(&sql, params_from_iter(params))?)
}

pub fn upsert<T: SqlEntity>(conn: &Connection, record: &T) -> Result<()> {
    let (sql, params) = upsert_statement(record)?;
    conn.execute(&sql, params_from_iter(params))?;
    Ok(())
}

/// One multi-row `INSERT … VALUES (…), (…) RETURNING …` statement.
///
/// Returns the rows as stored, identities included, ordered by identity
/// (`RETURNING` itself yields rows in no defined order). Callers keep
/// `records` within `rows_per_statement`.
pub fn insert_rows<T: SqlEntity>(conn: &Connection, records: &[T]) -> Result<Vec<T>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let row = placeholders(T::COLUMNS.len() + 1);
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING {}",
        T::TABLE,
        select_list::<T>(),
        vec![row.as_str(); records.len()].join(", "),
        select_list::<T>()
    );

    let params: Vec<Value> = records
        .iter()
        .flat_map(|record| std::iter::once(id_value(record)).chain(record.values()))
        .collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut stored = stmt
        .query_map(params_from_iter(params), T::from_row)?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    stored.sort_by_key(|record| record.id());
    Ok(stored)
}

/// Largest stored identity, `None` for an empty table
pub fn max_id<T: SqlEntity>(conn: &Connection) -> Result<Option<i64>> {
    let sql = format!("SELECT MAX({}) FROM {}", T::ID_COLUMN, T::TABLE);
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Rows ordered by identity
pub fn load_page<T: SqlEntity>(conn: &Connection, offset: usize, limit: usize) -> Result<Vec<T>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT ?1 OFFSET ?2",
        select_list::<T>(),
        T::TABLE,
        T::ID_COLUMN
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([limit as i64, offset as i64], T::from_row)?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(rows)
}
