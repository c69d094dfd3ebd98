//! Up command implementation

use anyhow::Result;
use sf_migrate::ApplyOutcome;

use crate::cli::GlobalArgs;
use crate::commands::common::run_engine;

/// Execute the up command: apply every pending migration
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    println!("Running pending migrations...");

    match run_engine(global, |runner| runner.apply_pending()).await? {
        ApplyOutcome::Applied { versions, elapsed } => {
            println!(
                "\nApplied {} migration{} in {}ms",
                versions.len(),
                if versions.len() == 1 { "" } else { "s" },
                elapsed.as_millis()
            );
        }
        ApplyOutcome::NothingToDo { elapsed } => {
            println!(
                "No pending migrations. Database is up to date ({}ms)",
                elapsed.as_millis()
            );
        }
    }
    Ok(())
}
