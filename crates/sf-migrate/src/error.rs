//! Error types for the migration engine.

use sf_db::DbError;
use std::fmt;
use thiserror::Error;

/// Which way a script moves the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "forward"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Migration engine errors.
///
/// Every variant is fatal for the operation that raised it.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Migrations directory could not be listed (MG001).
    #[error("[MG001] Failed to read migrations directory '{path}': {source}")]
    CatalogRead {
        path: String,
        source: std::io::Error,
    },

    /// A script file could not be read (MG002).
    #[error("[MG002] Failed to read migration file '{filename}': {source}")]
    ScriptRead {
        filename: String,
        source: std::io::Error,
    },

    /// A `.sql` file does not follow `NNN_description.sql` (MG003).
    #[error("[MG003] Invalid migration filename '{filename}': expected NNN_description.sql")]
    InvalidScriptName { filename: String },

    /// A forward or down script failed to execute (MG004).
    #[error("[MG004] {direction} script '{filename}' for migration {version} failed: {source}")]
    ScriptExecution {
        version: String,
        filename: String,
        direction: Direction,
        source: DbError,
    },

    /// Ledger already holds this version (MG005).
    #[error("[MG005] Migration {version} is already recorded in the ledger")]
    DuplicateVersion { version: String },

    /// Ledger holds a version with no script in the catalog (MG006).
    #[error("[MG006] Migration {version} found in ledger but not in migrations directory")]
    OrphanedLedgerEntry { version: String },

    /// Script was edited after being applied (MG007).
    #[error(
        "[MG007] Migration {version} has been modified after execution \
         (ledger checksum {recorded}, file checksum {current})"
    )]
    ChecksumMismatch {
        version: String,
        recorded: String,
        current: String,
    },

    /// Rollback requested but no reverse script exists (MG008).
    #[error("[MG008] No down script for migration {version} (expected '{expected}')")]
    MissingDownScript { version: String, expected: String },

    /// Ledger delete matched no row (MG009).
    #[error("[MG009] Migration {version} is not recorded in the ledger")]
    MissingLedgerEntry { version: String },

    /// Any other ledger read or write failure (MG010).
    #[error("[MG010] Ledger operation failed ({context}): {source}")]
    Ledger { context: String, source: DbError },

    /// BEGIN or COMMIT failed around a migration step (MG011).
    #[error("[MG011] Transaction for migration {version} failed: {source}")]
    Transaction { version: String, source: DbError },

    /// Another process holds the migration lock (MG012).
    #[error("[MG012] Migration lock is held by '{holder}' until {expires_at}")]
    LockHeld { holder: String, expires_at: String },

    /// Lock table failure (MG013).
    #[error("[MG013] Migration lock failed ({context}): {source}")]
    Lock { context: String, source: DbError },

    /// Ledger table name is not a valid identifier (MG014).
    #[error("[MG014] Invalid ledger table name '{0}'")]
    InvalidTableName(String),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// Wrap a ledger failure with a short description of the operation
    pub(crate) fn ledger(context: impl Into<String>) -> impl FnOnce(DbError) -> Self {
        let context = context.into();
        move |source| MigrateError::Ledger { context, source }
    }

    /// Wrap a lock failure with a short description of the operation
    pub(crate) fn lock(context: impl Into<String>) -> impl FnOnce(DbError) -> Self {
        let context = context.into();
        move |source| MigrateError::Lock { context, source }
    }

    /// Whether this error reports drift between ledger and catalog
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            MigrateError::OrphanedLedgerEntry { .. } | MigrateError::ChecksumMismatch { .. }
        )
    }
}
