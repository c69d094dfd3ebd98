//! Versioned schema migration engine.
//!
//! Discovers ordered `NNN_description.sql` scripts in a directory, applies the
//! pending ones one transaction at a time, records each applied version with a
//! SHA-256 checksum in a ledger table, verifies recorded checksums on every
//! run, and reverts versions through their `NNN_down_description.sql` scripts.
//!
//! The engine only needs an [`sf_db::Database`] handle and a directory path:
//!
//! ```no_run
//! use sf_db::DuckDbBackend;
//! use sf_migrate::{ApplyOutcome, MigrationRunner};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut db = DuckDbBackend::new("app.duckdb")?;
//! let mut runner = MigrationRunner::new(&mut db, Path::new("migrations"));
//! if let ApplyOutcome::Applied { versions, .. } = runner.apply_pending()? {
//!     println!("applied {} migrations", versions.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod lock;
pub mod runner;
pub mod script;
pub mod status;

pub use catalog::MigrationCatalog;
pub use error::{Direction, MigrateError, MigrateResult};
pub use hooks::MigrationHooks;
pub use ledger::{LedgerEntry, MigrationLedger};
pub use lock::{LockLease, LockOptions, MigrationLock};
pub use runner::{ApplyOutcome, MigrationRunner, RollbackOutcome};
pub use script::{DownScript, MigrationScript};
pub use status::{Drift, StatusReport};
