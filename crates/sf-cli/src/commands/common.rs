//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use sf_core::checksum::short;
use sf_core::Config;
use sf_db::{Database, DuckDbBackend};
use sf_migrate::{
    DownScript, MigrateError, MigrateResult, MigrationHooks, MigrationRunner, MigrationScript,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::GlobalArgs;

const IN_MEMORY: &str = ":memory:";

/// Exit code when the ledger disagrees with the migration files.
pub(crate) const EXIT_INTEGRITY: i32 = 2;

/// Exit code when the command exceeds `--timeout`.
pub(crate) const EXIT_TIMEOUT: i32 = 3;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the failure has already been reported.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Resolved project root plus configuration with all overrides applied
#[derive(Debug, Clone)]
pub(crate) struct ProjectContext {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl ProjectContext {
    /// Load `schemaflow.yml`, then apply `SF_*` env vars, then CLI flags.
    ///
    /// A relative database path is resolved against the project directory.
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let config = match &global.config {
            Some(path) => Config::load(&PathBuf::from(path)),
            None => Config::load_from_dir(&root),
        }
        .context("Failed to load configuration")?;

        let mut config = config
            .with_env_overrides()
            .context("Invalid configuration override")?;
        if let Some(dir) = &global.dir {
            config.migrations_dir = dir.clone();
        }
        if let Some(path) = &global.database {
            config.database.path = path.clone();
        }
        if global.no_lock {
            config.lock.enabled = false;
        }
        config.validate().context("Invalid configuration")?;

        let db_path = Path::new(&config.database.path);
        if config.database.path != IN_MEMORY && db_path.is_relative() {
            config.database.path = root.join(db_path).display().to_string();
        }

        Ok(Self { root, config })
    }

    pub(crate) fn migrations_dir(&self) -> PathBuf {
        self.config.migrations_dir_absolute(&self.root)
    }
}

/// Print verbose output if enabled
pub(crate) fn verbose(enabled: bool, msg: &str) {
    if enabled {
        eprintln!("[verbose] {}", msg);
    }
}

/// Open the configured database and check the connection
pub(crate) fn open_database(config: &Config, verbose_enabled: bool) -> Result<DuckDbBackend> {
    let db = DuckDbBackend::new(&config.database.path).context("Failed to connect to database")?;
    db.ping().context("Database connection check failed")?;
    verbose(
        verbose_enabled,
        &format!("Connected to {} database at {}", db.db_type(), config.database.path),
    );
    Ok(db)
}

/// Hooks that report each step on stdout
pub(crate) fn printing_hooks(verbose_enabled: bool) -> MigrationHooks {
    MigrationHooks {
        before_migration: Some(Box::new(move |script: &MigrationScript| {
            verbose(
                verbose_enabled,
                &format!("{} checksum {}", script.filename, short(&script.checksum)),
            );
        })),
        after_migration: Some(Box::new(|script: &MigrationScript, elapsed: Duration| {
            println!("  ✓ {} ({}ms)", script.version, elapsed.as_millis());
        })),
        before_rollback: Some(Box::new(move |down: &DownScript| {
            verbose(
                verbose_enabled,
                &format!("Rolling back {} using {}", down.reverses, down.filename),
            );
        })),
        after_rollback: Some(Box::new(|down: &DownScript, elapsed: Duration| {
            println!("  ↺ {} ({}ms)", down.reverses, elapsed.as_millis());
        })),
        on_error: None,
    }
}

/// Run a migration operation on a blocking thread under the `--timeout` deadline.
///
/// The database is opened and the runner built inside the task, so the whole
/// operation, including the connection check, counts against the deadline.
pub(crate) async fn run_engine<T, F>(global: &GlobalArgs, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut MigrationRunner<'_>) -> MigrateResult<T> + Send + 'static,
{
    let ctx = ProjectContext::load(global)?;
    let verbose_enabled = global.verbose;
    verbose(
        verbose_enabled,
        &format!(
            "Migrations directory: {}, ledger table: {}",
            ctx.migrations_dir().display(),
            ctx.config.ledger_table
        ),
    );

    let task = tokio::task::spawn_blocking(move || -> Result<T> {
        let mut db = open_database(&ctx.config, verbose_enabled)?;
        let mut runner = MigrationRunner::from_config(&mut db, &ctx.config, &ctx.root)?
            .with_hooks(printing_hooks(verbose_enabled));
        Ok(op(&mut runner)?)
    });

    match tokio::time::timeout(Duration::from_secs(global.timeout), task).await {
        Ok(joined) => joined.context("Migration task failed")?.map_err(report_integrity),
        Err(_) => {
            eprintln!(
                "Error: migration command timed out after {}s",
                global.timeout
            );
            Err(ExitCode(EXIT_TIMEOUT).into())
        }
    }
}

/// Turn ledger drift into [`EXIT_INTEGRITY`] after printing it; other errors pass through
fn report_integrity(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<MigrateError>() {
        Some(e) if e.is_integrity_failure() => {
            eprintln!("Error: {e}");
            eprintln!("Run `sf status` to see every drifted migration.");
            ExitCode(EXIT_INTEGRITY).into()
        }
        _ => err,
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
