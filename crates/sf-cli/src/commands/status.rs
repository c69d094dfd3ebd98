//! Status command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::run_engine;

/// Execute the status command. Read-only: never creates the ledger table.
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let report = run_engine(global, |runner| runner.status()).await?;

    match args.output {
        StatusOutput::Table => {
            println!();
            print!("{report}");
            if report.has_drift() {
                println!("\nDrift detected: run `sf verify` for details.");
            }
        }
        StatusOutput::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
            println!("{json}");
        }
    }
    Ok(())
}
