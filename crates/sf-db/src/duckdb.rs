//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Executor, Transaction};
use crate::value::{SqlRow, SqlValue};
use duckdb::types::{ToSql, ToSqlOutput, Value};
use duckdb::{params_from_iter, Connection};
use std::path::Path;

/// DuckDB database backend.
///
/// Single-threaded: migrations run sequentially, so the connection is owned
/// directly and transactions borrow it mutably.
pub struct DuckDbBackend {
    conn: Connection,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }
}

impl Executor for DuckDbBackend {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        execute_on(&self.conn, sql, params)
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        batch_on(&self.conn, sql)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        query_on(&self.conn, sql, params)
    }
}

impl Database for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    fn begin(&mut self) -> DbResult<Box<dyn Transaction + '_>> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(DuckDbTransaction { tx }))
    }
}

/// An open DuckDB transaction; rolls back on drop unless committed
pub struct DuckDbTransaction<'conn> {
    tx: duckdb::Transaction<'conn>,
}

impl Executor for DuckDbTransaction<'_> {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        execute_on(&self.tx, sql, params)
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        batch_on(&self.tx, sql)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        query_on(&self.tx, sql, params)
    }
}

impl Transaction for DuckDbTransaction<'_> {
    fn commit(self: Box<Self>) -> DbResult<()> {
        let this = *self;
        this.tx
            .commit()
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(self: Box<Self>) -> DbResult<()> {
        let this = *self;
        this.tx
            .rollback()
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => Value::Null,
            SqlValue::Boolean(b) => Value::Boolean(*b),
            SqlValue::Integer(n) => Value::BigInt(*n),
            SqlValue::Double(f) => Value::Double(*f),
            SqlValue::Text(s) => Value::Text(s.clone()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

fn execute_on(conn: &Connection, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
    log::trace!("execute: {sql}");
    Ok(conn.execute(sql, params_from_iter(params.iter()))?)
}

fn batch_on(conn: &Connection, sql: &str) -> DbResult<()> {
    log::trace!("execute_batch: {} bytes", sql.len());
    Ok(conn.execute_batch(sql)?)
}

/// DuckDB panics on `stmt.column_count()` before execution, so the column
/// count is read from each row instead.
fn query_on(conn: &Connection, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let col_count = row.as_ref().column_count();
            Ok(SqlRow::new(
                (0..col_count).map(|i| read_cell(row, i)).collect(),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Read a cell by trying text, integer, float, then boolean.
fn read_cell(row: &duckdb::Row<'_>, idx: usize) -> SqlValue {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return SqlValue::Text(s);
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return SqlValue::Integer(n);
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return SqlValue::Double(f);
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return SqlValue::Boolean(b);
    }
    SqlValue::Null
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
