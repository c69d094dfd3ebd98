//! Schemaflow CLI - versioned schema migrations for DuckDB

use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::common::{ExitCode, EXIT_TIMEOUT};
use commands::{down, rollback_last, status, up, verify};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        cli::Commands::Up => up::execute(&cli.global).await,
        cli::Commands::Down(args) => down::execute(args, &cli.global).await,
        cli::Commands::RollbackLast => rollback_last::execute(&cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
        cli::Commands::Verify => verify::execute(&cli.global).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            // The blocking migration task cannot be cancelled, and runtime
            // shutdown would wait for it. Its open transaction dies with the process;
            // its lock row does not, and expires with the lease.
            Some(ExitCode(code)) if *code == EXIT_TIMEOUT => std::process::exit(*code),
            Some(ExitCode(code)) => std::process::ExitCode::from(u8::try_from(*code).unwrap_or(1)),
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}
