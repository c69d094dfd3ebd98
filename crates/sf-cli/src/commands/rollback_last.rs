//! Rollback-last command implementation

use anyhow::Result;
use sf_migrate::RollbackOutcome;

use crate::cli::GlobalArgs;
use crate::commands::common::run_engine;

/// Execute the rollback-last command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    println!("Rolling back last migration...");

    match run_engine(global, |runner| runner.rollback_last()).await? {
        RollbackOutcome::RolledBack { versions, .. } => {
            println!("\nRolled back {}", versions.join(", "));
        }
        RollbackOutcome::NothingToDo => println!("No migrations to roll back"),
    }
    Ok(())
}
