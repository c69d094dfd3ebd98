//! Verify command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::run_engine;

/// Execute the verify command: compare recorded checksums with the files on disk
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let verified = run_engine(global, |runner| runner.verify()).await?;
    println!(
        "Verified {} migration checksum{}: ledger matches migration files",
        verified,
        if verified == 1 { "" } else { "s" }
    );
    Ok(())
}
