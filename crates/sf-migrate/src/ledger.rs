//! Persistent record of applied migrations.
//!
//! One row per applied version in the ledger table (`schema_migrations` by
//! default). Every method takes an [`Executor`] so the same calls work inside
//! a migration step's transaction and on the plain connection.

use crate::error::{MigrateError, MigrateResult};
use chrono::{DateTime, Utc};
use sf_core::checksum::{is_legacy, LEGACY_CHECKSUM};
use sf_core::config::is_valid_table_name;
use sf_db::{DbError, Executor, SqlRow};
use std::collections::BTreeMap;

/// Default ledger table name.
pub const DEFAULT_LEDGER_TABLE: &str = "schema_migrations";

/// A persisted ledger row
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub version: String,
    pub executed_at: DateTime<Utc>,
    pub checksum: String,
}

impl LedgerEntry {
    /// Whether this row pre-dates checksumming
    pub fn is_legacy(&self) -> bool {
        is_legacy(&self.checksum)
    }

    fn from_row(row: &SqlRow) -> Self {
        let executed_at = row
            .integer(1)
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default();
        Self {
            version: row.text(0).unwrap_or_default().to_string(),
            executed_at,
            // NULL only when the backfill in `ensure_schema` has not run yet
            checksum: row.text(2).unwrap_or(LEGACY_CHECKSUM).to_string(),
        }
    }
}

/// Ledger table accessor
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    table: String,
}

impl Default for MigrationLedger {
    fn default() -> Self {
        Self {
            table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }
}

impl MigrationLedger {
    /// Create a ledger over `table`, which may be schema-qualified
    pub fn new(table: &str) -> MigrateResult<Self> {
        if !is_valid_table_name(table) {
            return Err(MigrateError::InvalidTableName(table.to_string()));
        }
        Ok(Self {
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn schema(&self) -> Option<&str> {
        self.table.rsplit_once('.').map(|(schema, _)| schema)
    }

    /// Index on `executed_at`, qualified with the table's schema when needed
    fn index_name(&self) -> String {
        let bare = self.index_bare_name();
        match self.schema() {
            Some(schema) => format!("{schema}.{bare}"),
            None => bare,
        }
    }

    fn index_bare_name(&self) -> String {
        format!("idx_{}_executed_at", self.table.replace('.', "_"))
    }

    /// Whether the ledger table exists yet
    pub fn exists<E: Executor + ?Sized>(&self, exec: &E) -> MigrateResult<bool> {
        exec.relation_exists(&self.table)
            .map_err(MigrateError::ledger("check ledger table"))
    }

    /// Create or upgrade the ledger table. Safe to call on every startup.
    ///
    /// Tables created before checksums existed gain a `checksum` column and
    /// their rows are backfilled with the legacy sentinel.
    pub fn ensure_schema<E: Executor + ?Sized>(&self, exec: &E) -> MigrateResult<()> {
        if let Some(schema) = self.schema() {
            exec.execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {schema};"))
                .map_err(MigrateError::ledger("create ledger schema"))?;
        }

        exec.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 version     VARCHAR PRIMARY KEY,
                 executed_at TIMESTAMP NOT NULL DEFAULT now(),
                 checksum    VARCHAR
             );",
            self.table
        ))
        .map_err(MigrateError::ledger("create ledger table"))?;

        let has_checksum = exec
            .column_exists(&self.table, "checksum")
            .map_err(MigrateError::ledger("inspect ledger columns"))?;
        if !has_checksum {
            log::info!("Upgrading ledger {}: adding checksum column", self.table);
            // DuckDB refuses ALTER TABLE while an index depends on the table
            exec.execute_batch(&format!(
                "DROP INDEX IF EXISTS {};
                 ALTER TABLE {} ADD COLUMN checksum VARCHAR;",
                self.index_name(),
                self.table
            ))
            .map_err(MigrateError::ledger("add checksum column"))?;
        }

        let backfilled = exec
            .execute(
                &format!(
                    "UPDATE {} SET checksum = ? WHERE checksum IS NULL",
                    self.table
                ),
                &[LEGACY_CHECKSUM.into()],
            )
            .map_err(MigrateError::ledger("backfill legacy checksums"))?;
        if backfilled > 0 {
            log::info!(
                "Marked {backfilled} ledger rows in {} as legacy (no original checksum)",
                self.table
            );
        }

        exec.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (executed_at);",
            self.index_bare_name(),
            self.table
        ))
        .map_err(MigrateError::ledger("create executed_at index"))?;

        Ok(())
    }

    /// All ledger rows ordered by version
    pub fn entries<E: Executor + ?Sized>(&self, exec: &E) -> MigrateResult<Vec<LedgerEntry>> {
        let rows = exec
            .query(
                &format!(
                    "SELECT version, epoch_ms(executed_at), checksum FROM {} ORDER BY version",
                    self.table
                ),
                &[],
            )
            .map_err(MigrateError::ledger("read ledger"))?;
        Ok(rows.iter().map(LedgerEntry::from_row).collect())
    }

    /// Applied versions mapped to their recorded checksums
    pub fn list_applied<E: Executor + ?Sized>(
        &self,
        exec: &E,
    ) -> MigrateResult<BTreeMap<String, String>> {
        Ok(self
            .entries(exec)?
            .into_iter()
            .map(|e| (e.version, e.checksum))
            .collect())
    }

    /// Insert a row for `version`; never overwrites an existing one
    pub fn record_applied<E: Executor + ?Sized>(
        &self,
        exec: &E,
        version: &str,
        checksum: &str,
    ) -> MigrateResult<()> {
        exec.execute(
            &format!(
                "INSERT INTO {} (version, checksum) VALUES (?, ?)",
                self.table
            ),
            &[version.into(), checksum.into()],
        )
        .map_err(|e| match e {
            DbError::ConstraintViolation(_) => MigrateError::DuplicateVersion {
                version: version.to_string(),
            },
            other => MigrateError::ledger(format!("record {version}"))(other),
        })?;
        Ok(())
    }

    /// Delete the row for `version`; zero affected rows is an error
    pub fn remove_applied<E: Executor + ?Sized>(&self, exec: &E, version: &str) -> MigrateResult<()> {
        let removed = exec
            .execute(
                &format!("DELETE FROM {} WHERE version = ?", self.table),
                &[version.into()],
            )
            .map_err(MigrateError::ledger(format!("remove {version}")))?;
        if removed == 0 {
            return Err(MigrateError::MissingLedgerEntry {
                version: version.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
