//! Transactional execution handle consumed by the migration engine

use crate::error::DbResult;
use crate::value::{SqlRow, SqlValue};

/// Statement execution shared by plain connections and open transactions.
///
/// Ledger and lock code is written against this trait so the same helpers run
/// either inside a migration step's transaction or on the bare connection.
pub trait Executor {
    /// Execute one statement with positional parameters, returning affected rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Execute a script of one or more statements without parameters
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and collect every row
    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>>;

    /// Check whether a table or view exists.
    ///
    /// Unqualified names are resolved against `current_schema()`.
    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified(name);
        let rows = match schema {
            Some(schema) => self.query(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND table_name = ?",
                &[schema.into(), table.into()],
            )?,
            None => self.query(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = ?",
                &[table.into()],
            )?,
        };
        Ok(first_count(&rows) > 0)
    }

    /// Check whether `table` has a column named `column`
    fn column_exists(&self, table: &str, column: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified(table);
        let rows = match schema {
            Some(schema) => self.query(
                "SELECT COUNT(*) FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? AND column_name = ?",
                &[schema.into(), table.into(), column.into()],
            )?,
            None => self.query(
                "SELECT COUNT(*) FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = ? AND column_name = ?",
                &[table.into(), column.into()],
            )?,
        };
        Ok(first_count(&rows) > 0)
    }
}

/// An open transaction.
///
/// Dropping a transaction without calling [`commit`](Transaction::commit)
/// rolls it back, including during unwinding.
pub trait Transaction: Executor {
    /// Commit all work done in this transaction
    fn commit(self: Box<Self>) -> DbResult<()>;

    /// Roll back explicitly
    fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// A database connection able to open transactions
pub trait Database: Executor + Send {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Begin a transaction scoped to the returned guard
    fn begin(&mut self) -> DbResult<Box<dyn Transaction + '_>>;

    /// Validate the connection with a trivial round trip
    fn ping(&self) -> DbResult<()> {
        self.query("SELECT 1", &[]).map(|_| ())
    }
}

/// Split `schema.table` into its parts
pub(crate) fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

fn first_count(rows: &[SqlRow]) -> i64 {
    rows.first().and_then(|r| r.integer(0)).unwrap_or(0)
}
