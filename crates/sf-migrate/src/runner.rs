//! Applies and reverts migrations against a database.
//!
//! Every forward or down script runs in its own transaction together with its
//! ledger write, so a failed step leaves neither schema changes nor a ledger
//! row behind. Mutating operations hold the migration lock for their whole
//! duration when locking is enabled.

use crate::catalog::{expected_down_filename, MigrationCatalog};
use crate::error::{Direction, MigrateError, MigrateResult};
use crate::hooks::MigrationHooks;
use crate::ledger::MigrationLedger;
use crate::lock::{LockOptions, MigrationLock};
use crate::script::MigrationScript;
use crate::status::StatusReport;
use sf_core::checksum::short;
use sf_core::{Config, Version};
use sf_db::Database;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Result of [`MigrationRunner::apply_pending`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// At least one script was applied, in this order
    Applied {
        versions: Vec<Version>,
        elapsed: Duration,
    },
    /// Ledger was already current; integrity was still verified
    NothingToDo { elapsed: Duration },
}

impl ApplyOutcome {
    pub fn applied_count(&self) -> usize {
        self.versions().len()
    }

    pub fn versions(&self) -> &[Version] {
        match self {
            ApplyOutcome::Applied { versions, .. } => versions,
            ApplyOutcome::NothingToDo { .. } => &[],
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            ApplyOutcome::Applied { elapsed, .. } | ApplyOutcome::NothingToDo { elapsed } => {
                *elapsed
            }
        }
    }
}

/// Result of [`MigrationRunner::rollback_last`] and [`MigrationRunner::rollback_to`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Versions reverted, most recent first
    RolledBack {
        versions: Vec<String>,
        elapsed: Duration,
    },
    NothingToDo,
}

impl RollbackOutcome {
    pub fn rolled_back_count(&self) -> usize {
        self.versions().len()
    }

    pub fn versions(&self) -> &[String] {
        match self {
            RollbackOutcome::RolledBack { versions, .. } => versions,
            RollbackOutcome::NothingToDo => &[],
        }
    }
}

/// Migration runner bound to one database handle and one migrations directory
pub struct MigrationRunner<'db> {
    db: &'db mut dyn Database,
    dir: PathBuf,
    ledger: MigrationLedger,
    lock: Option<MigrationLock>,
    hooks: MigrationHooks,
}

impl<'db> MigrationRunner<'db> {
    /// Runner with the default ledger table and locking enabled
    pub fn new(db: &'db mut dyn Database, dir: &Path) -> Self {
        let ledger = MigrationLedger::default();
        let lock = MigrationLock::new(ledger.table(), LockOptions::default());
        Self {
            db,
            dir: dir.to_path_buf(),
            ledger,
            lock: Some(lock),
            hooks: MigrationHooks::default(),
        }
    }

    /// Runner configured from a loaded [`Config`], resolving the migrations
    /// directory against `root`
    pub fn from_config(db: &'db mut dyn Database, config: &Config, root: &Path) -> MigrateResult<Self> {
        let ledger = MigrationLedger::new(&config.ledger_table)?;
        let runner = Self::new(db, &config.migrations_dir_absolute(root)).with_ledger(ledger);
        Ok(if config.lock.enabled {
            runner.with_lock_options(LockOptions {
                lease: config.lease(),
            })
        } else {
            runner.without_lock()
        })
    }

    /// Use a different ledger table. The lock table follows it.
    #[must_use]
    pub fn with_ledger(mut self, ledger: MigrationLedger) -> Self {
        self.lock = self.lock.map(|lock| {
            MigrationLock::with_holder(
                ledger.table(),
                LockOptions { lease: lock.lease() },
                lock.holder(),
            )
        });
        self.ledger = ledger;
        self
    }

    /// Enable locking with the given lease
    #[must_use]
    pub fn with_lock_options(mut self, options: LockOptions) -> Self {
        self.lock = Some(match self.lock {
            Some(lock) => MigrationLock::with_holder(self.ledger.table(), options, lock.holder()),
            None => MigrationLock::new(self.ledger.table(), options),
        });
        self
    }

    /// Use a specific lock instance, e.g. one with a known holder id
    #[must_use]
    pub fn with_lock(mut self, lock: MigrationLock) -> Self {
        self.lock = Some(lock);
        self
    }

    #[must_use]
    pub fn without_lock(mut self) -> Self {
        self.lock = None;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: MigrationHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Apply every pending script in ascending order, then verify the ledger.
    ///
    /// Stops at the first failing script; earlier scripts of the same run stay
    /// committed. Integrity is checked after the pending scripts run, so an
    /// applied script edited on disk is reported only once every pending
    /// script has been committed. A run with nothing pending never mutates
    /// the database before an integrity failure.
    pub fn apply_pending(&mut self) -> MigrateResult<ApplyOutcome> {
        self.locked(Self::apply_pending_locked)
    }

    /// Revert the lexically greatest applied version
    pub fn rollback_last(&mut self) -> MigrateResult<RollbackOutcome> {
        self.locked(Self::rollback_last_locked)
    }

    /// Revert every applied version greater than `target`, newest first.
    ///
    /// Each version is its own transaction. On failure the versions already
    /// reverted stay reverted.
    pub fn rollback_to(&mut self, target: &str) -> MigrateResult<RollbackOutcome> {
        self.locked(|runner| runner.rollback_to_locked(target))
    }

    /// Load the catalog from the migrations directory
    pub fn load_catalog(&self) -> MigrateResult<MigrationCatalog> {
        MigrationCatalog::load(&self.dir)
    }

    /// Applied versions and their recorded checksums. A missing ledger table
    /// reads as empty.
    pub fn list_applied(&self) -> MigrateResult<BTreeMap<String, String>> {
        if !self.ledger.exists(&*self.db)? {
            return Ok(BTreeMap::new());
        }
        self.ledger.list_applied(&*self.db)
    }

    /// Applied and pending migrations with drift state. Never writes.
    pub fn status(&self) -> MigrateResult<StatusReport> {
        let catalog = self.load_catalog()?;
        let entries = if self.ledger.exists(&*self.db)? {
            self.ledger.entries(&*self.db)?
        } else {
            Vec::new()
        };
        Ok(StatusReport::build(&catalog, &entries))
    }

    /// Check every ledger row against the catalog without applying anything.
    /// Returns the number of rows whose checksum was verified.
    pub fn verify(&self) -> MigrateResult<usize> {
        if !self.ledger.exists(&*self.db)? {
            return Ok(0);
        }
        let catalog = self.load_catalog()?;
        self.verify_integrity(&catalog)
    }

    fn locked<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> MigrateResult<T>,
    ) -> MigrateResult<T> {
        let lock = self.lock.clone();
        if let Some(lock) = &lock {
            if let Err(e) = lock.acquire(&*self.db) {
                self.hooks.on_error(&e);
                return Err(e);
            }
        }

        // A panicking step (usually a hook) must not leave the lease behind.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| op(&mut *self)));

        let released = match &lock {
            Some(lock) => lock.release(&*self.db).map(|_| ()),
            None => Ok(()),
        };

        let mut result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                if let Err(e) = released {
                    log::warn!("Failed to release migration lock after panic: {e}");
                }
                panic::resume_unwind(payload);
            }
        };

        match released {
            Ok(()) => {}
            Err(e) if result.is_ok() => result = Err(e),
            Err(e) => log::warn!("Failed to release migration lock: {e}"),
        }

        if let Err(e) = &result {
            self.hooks.on_error(e);
        }
        result
    }

    fn apply_pending_locked(&mut self) -> MigrateResult<ApplyOutcome> {
        let started = Instant::now();
        log::info!("Starting migration run from {}", self.dir.display());

        self.ledger.ensure_schema(&*self.db)?;
        let catalog = self.load_catalog()?;
        let applied = self.ledger.list_applied(&*self.db)?;

        let pending: Vec<&MigrationScript> = catalog
            .scripts()
            .iter()
            .filter(|script| !applied.contains_key(script.version.as_str()))
            .collect();
        log::info!(
            "Found {} migration scripts, {} applied, {} pending",
            catalog.len(),
            applied.len(),
            pending.len()
        );

        let mut versions = Vec::with_capacity(pending.len());
        for script in pending {
            self.apply_one(script)?;
            versions.push(script.version.clone());
        }

        let verified = self.verify_integrity(&catalog)?;
        let elapsed = started.elapsed();
        log::info!(
            "Migration run completed in {:?}: {} applied, {} checksums verified",
            elapsed,
            versions.len(),
            verified
        );

        Ok(if versions.is_empty() {
            ApplyOutcome::NothingToDo { elapsed }
        } else {
            ApplyOutcome::Applied { versions, elapsed }
        })
    }

    fn apply_one(&mut self, script: &MigrationScript) -> MigrateResult<()> {
        let started = Instant::now();
        let version = script.version.as_str();
        self.hooks.before_migration(script);
        log::info!(
            "Applying migration {} (checksum {})",
            version,
            short(&script.checksum)
        );

        let tx = self.db.begin().map_err(|source| MigrateError::Transaction {
            version: version.to_string(),
            source,
        })?;
        tx.execute_batch(&script.body)
            .map_err(|source| MigrateError::ScriptExecution {
                version: version.to_string(),
                filename: script.filename.clone(),
                direction: Direction::Up,
                source,
            })?;
        self.ledger
            .record_applied(&*tx, version, &script.checksum)?;
        tx.commit().map_err(|source| MigrateError::Transaction {
            version: version.to_string(),
            source,
        })?;

        let elapsed = started.elapsed();
        log::info!("Applied migration {} in {:?}", version, elapsed);
        self.hooks.after_migration(script, elapsed);
        Ok(())
    }

    /// Compare every ledger row with `catalog`. Legacy rows are skipped.
    fn verify_integrity(&self, catalog: &MigrationCatalog) -> MigrateResult<usize> {
        let mut verified = 0;
        for entry in self.ledger.entries(&*self.db)? {
            let Some(script) = catalog.get(&entry.version) else {
                log::warn!(
                    "Migration {} is recorded in {} but missing from {}",
                    entry.version,
                    self.ledger.table(),
                    catalog.dir().display()
                );
                return Err(MigrateError::OrphanedLedgerEntry {
                    version: entry.version,
                });
            };

            if entry.is_legacy() {
                log::info!(
                    "Skipping checksum verification for legacy migration {}",
                    entry.version
                );
                continue;
            }

            if script.checksum != entry.checksum {
                log::warn!(
                    "Checksum mismatch for {}: recorded {}, file {}",
                    entry.version,
                    short(&entry.checksum),
                    short(&script.checksum)
                );
                return Err(MigrateError::ChecksumMismatch {
                    version: entry.version,
                    recorded: entry.checksum,
                    current: script.checksum.clone(),
                });
            }
            verified += 1;
        }
        Ok(verified)
    }

    fn rollback_last_locked(&mut self) -> MigrateResult<RollbackOutcome> {
        let started = Instant::now();
        self.ledger.ensure_schema(&*self.db)?;

        let applied = self.ledger.list_applied(&*self.db)?;
        let Some(last) = applied.into_keys().next_back() else {
            log::info!("No applied migrations to roll back");
            return Ok(RollbackOutcome::NothingToDo);
        };

        let catalog = self.load_catalog()?;
        self.rollback_one(&catalog, &last)?;

        Ok(RollbackOutcome::RolledBack {
            versions: vec![last],
            elapsed: started.elapsed(),
        })
    }

    fn rollback_to_locked(&mut self, target: &str) -> MigrateResult<RollbackOutcome> {
        let started = Instant::now();
        self.ledger.ensure_schema(&*self.db)?;

        let applied = self.ledger.list_applied(&*self.db)?;
        let catalog = self.load_catalog()?;

        let candidates: Vec<String> = applied
            .into_keys()
            .rev()
            .filter(|version| version.as_str() > target)
            .collect();
        if candidates.is_empty() {
            log::info!("No applied migrations after {target}");
            return Ok(RollbackOutcome::NothingToDo);
        }
        log::info!(
            "Rolling back {} migrations to reach {}",
            candidates.len(),
            target
        );

        for (done, version) in candidates.iter().enumerate() {
            if let Err(e) = self.rollback_one(&catalog, version) {
                if done > 0 {
                    log::warn!(
                        "Rollback to {} stopped at {} after reverting {} of {} migrations",
                        target,
                        version,
                        done,
                        candidates.len()
                    );
                }
                return Err(e);
            }
        }

        let elapsed = started.elapsed();
        log::info!("Rollback to {} completed in {:?}", target, elapsed);
        Ok(RollbackOutcome::RolledBack {
            versions: candidates,
            elapsed,
        })
    }

    fn rollback_one(&mut self, catalog: &MigrationCatalog, version: &str) -> MigrateResult<()> {
        let started = Instant::now();
        let down = catalog
            .down_for(version)
            .ok_or_else(|| MigrateError::MissingDownScript {
                version: version.to_string(),
                expected: expected_down_filename(version),
            })?;
        let body = down.read_body()?;

        self.hooks.before_rollback(down);
        log::info!("Rolling back migration {} using {}", version, down.filename);

        let tx = self.db.begin().map_err(|source| MigrateError::Transaction {
            version: version.to_string(),
            source,
        })?;
        tx.execute_batch(&body)
            .map_err(|source| MigrateError::ScriptExecution {
                version: version.to_string(),
                filename: down.filename.clone(),
                direction: Direction::Down,
                source,
            })?;
        self.ledger.remove_applied(&*tx, version)?;
        tx.commit().map_err(|source| MigrateError::Transaction {
            version: version.to_string(),
            source,
        })?;

        let elapsed = started.elapsed();
        log::info!("Rolled back migration {} in {:?}", version, elapsed);
        self.hooks.after_rollback(down, elapsed);
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
