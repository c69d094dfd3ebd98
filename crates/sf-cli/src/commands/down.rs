//! Down command implementation

use anyhow::Result;
use sf_migrate::RollbackOutcome;

use crate::cli::{DownArgs, GlobalArgs};
use crate::commands::common::run_engine;

/// Execute the down command: roll back everything applied after `--target`
pub async fn execute(args: &DownArgs, global: &GlobalArgs) -> Result<()> {
    println!("Rolling back migrations to version: {}", args.target);

    let target = args.target.clone();
    match run_engine(global, move |runner| runner.rollback_to(&target)).await? {
        RollbackOutcome::RolledBack { versions, elapsed } => {
            println!(
                "\nRolled back {} migration{} in {}ms",
                versions.len(),
                if versions.len() == 1 { "" } else { "s" },
                elapsed.as_millis()
            );
        }
        RollbackOutcome::NothingToDo => {
            println!("Nothing to roll back: no migrations applied after {}", args.target);
        }
    }
    Ok(())
}
