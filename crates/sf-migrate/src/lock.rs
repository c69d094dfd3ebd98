//! Cross-process migration lock.
//!
//! A single lease row in `<ledger>_lock` serializes mutating runs across
//! processes sharing a database. The row expires after the lease duration so
//! a holder that died without releasing does not block later runs forever.

use crate::error::{MigrateError, MigrateResult};
use chrono::{DateTime, Utc};
use sf_db::{DbError, Executor};
use std::time::Duration;
use uuid::Uuid;

const LOCK_ID: i64 = 1;

/// Default lease duration.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(300);

/// Lock settings passed to the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub lease: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            lease: DEFAULT_LEASE,
        }
    }
}

/// Current lease holder as stored in the lock table
#[derive(Debug, Clone, PartialEq)]
pub struct LockLease {
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Lease lock over `<ledger_table>_lock`
#[derive(Debug, Clone)]
pub struct MigrationLock {
    table: String,
    holder: String,
    lease: Duration,
}

impl MigrationLock {
    /// Create a lock next to `ledger_table` with a unique holder id
    pub fn new(ledger_table: &str, options: LockOptions) -> Self {
        let holder = format!("{}:{}", Uuid::new_v4(), std::process::id());
        Self::with_holder(ledger_table, options, holder)
    }

    pub fn with_holder(ledger_table: &str, options: LockOptions, holder: impl Into<String>) -> Self {
        Self {
            table: format!("{ledger_table}_lock"),
            holder: holder.into(),
            lease: options.lease,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    fn ensure_table<E: Executor + ?Sized>(&self, exec: &E) -> MigrateResult<()> {
        if let Some((schema, _)) = self.table.rsplit_once('.') {
            exec.execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {schema};"))
                .map_err(MigrateError::lock("create lock schema"))?;
        }
        exec.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 lock_id        INTEGER PRIMARY KEY,
                 holder         VARCHAR NOT NULL,
                 acquired_at_ms BIGINT NOT NULL,
                 expires_at_ms  BIGINT NOT NULL
             );",
            self.table
        ))
        .map_err(MigrateError::lock("create lock table"))
    }

    /// Take the lease, replacing an expired one.
    ///
    /// Fails with [`MigrateError::LockHeld`] while another live lease exists.
    pub fn acquire<E: Executor + ?Sized>(&self, exec: &E) -> MigrateResult<()> {
        self.ensure_table(exec)?;

        let now = Utc::now();
        let expired = exec
            .execute(
                &format!(
                    "DELETE FROM {} WHERE lock_id = ? AND expires_at_ms <= ?",
                    self.table
                ),
                &[LOCK_ID.into(), now.timestamp_millis().into()],
            )
            .map_err(MigrateError::lock("clear expired lease"))?;
        if expired > 0 {
            log::warn!("Took over expired migration lock in {}", self.table);
        }

        let lease_ms = i64::try_from(self.lease.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = now.timestamp_millis().saturating_add(lease_ms);

        let inserted = exec.execute(
            &format!(
                "INSERT INTO {} (lock_id, holder, acquired_at_ms, expires_at_ms) VALUES (?, ?, ?, ?)",
                self.table
            ),
            &[
                LOCK_ID.into(),
                self.holder.as_str().into(),
                now.timestamp_millis().into(),
                expires_at_ms.into(),
            ],
        );

        match inserted {
            Ok(_) => {
                log::debug!("Acquired migration lock as {}", self.holder);
                Ok(())
            }
            Err(DbError::ConstraintViolation(_)) => {
                let current = self.current(exec)?;
                Err(MigrateError::LockHeld {
                    holder: current
                        .as_ref()
                        .map_or_else(|| "unknown".to_string(), |l| l.holder.clone()),
                    expires_at: current
                        .map_or_else(|| "unknown".to_string(), |l| l.expires_at.to_rfc3339()),
                })
            }
            Err(e) => Err(MigrateError::lock("insert lease")(e)),
        }
    }

    /// Release the lease if this holder owns it. Returns whether a row was removed.
    pub fn release<E: Executor + ?Sized>(&self, exec: &E) -> MigrateResult<bool> {
        let removed = exec
            .execute(
                &format!(
                    "DELETE FROM {} WHERE lock_id = ? AND holder = ?",
                    self.table
                ),
                &[LOCK_ID.into(), self.holder.as_str().into()],
            )
            .map_err(MigrateError::lock("release lease"))?;
        if removed == 0 {
            log::warn!(
                "Migration lock in {} was no longer held by {}",
                self.table,
                self.holder
            );
        }
        Ok(removed > 0)
    }

    /// Read the current lease, if any
    pub fn current<E: Executor + ?Sized>(&self, exec: &E) -> MigrateResult<Option<LockLease>> {
        let rows = exec
            .query(
                &format!(
                    "SELECT holder, acquired_at_ms, expires_at_ms FROM {} WHERE lock_id = ?",
                    self.table
                ),
                &[LOCK_ID.into()],
            )
            .map_err(MigrateError::lock("read lease"))?;

        Ok(rows.first().map(|row| LockLease {
            holder: row.text(0).unwrap_or_default().to_string(),
            acquired_at: row
                .integer(1)
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or_default(),
            expires_at: row
                .integer(2)
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
