//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Schemaflow - versioned schema migrations
#[derive(Parser, Debug)]
#[command(name = "sf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Migrations directory (relative to the project directory)
    #[arg(short, long, global = true, env = "SF_MIGRATIONS_DIR")]
    pub dir: Option<String>,

    /// Database path, or :memory:
    #[arg(long, global = true, env = "SF_DATABASE_PATH")]
    pub database: Option<String>,

    /// Overall deadline for the command, in seconds.
    ///
    /// A timed-out run exits without releasing the migration lock; other runs
    /// are blocked until its lease expires (`lock.lease_seconds`).
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Do not take the migration lock
    #[arg(long, global = true)]
    pub no_lock: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply all pending migrations
    Up,

    /// Roll back every migration applied after the target version
    Down(DownArgs),

    /// Roll back the most recently applied migration
    RollbackLast,

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// Check recorded checksums against the migration files
    Verify,
}

/// Arguments for the down command
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Version to roll back to; it stays applied
    #[arg(short, long)]
    pub target: String,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Human-readable listing
    Table,
    /// JSON document
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
