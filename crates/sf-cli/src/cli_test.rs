use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_down_target() {
    let cli = Cli::try_parse_from(["sf", "down", "--target", "001_users"]).unwrap();
    match cli.command {
        Commands::Down(args) => assert_eq!(args.target, "001_users"),
        other => panic!("expected down, got {other:?}"),
    }
}

#[test]
fn test_down_requires_target() {
    assert!(Cli::try_parse_from(["sf", "down"]).is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "sf",
        "up",
        "--dir",
        "db/migrations",
        "--database",
        "app.duckdb",
        "--timeout",
        "5",
        "--no-lock",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Up));
    assert_eq!(cli.global.dir.as_deref(), Some("db/migrations"));
    assert_eq!(cli.global.database.as_deref(), Some("app.duckdb"));
    assert_eq!(cli.global.timeout, 5);
    assert!(cli.global.no_lock);
}

#[test]
fn test_status_output_default_and_json() {
    let cli = Cli::try_parse_from(["sf", "status"]).unwrap();
    match cli.command {
        Commands::Status(args) => assert_eq!(args.output, StatusOutput::Table),
        other => panic!("expected status, got {other:?}"),
    }

    let cli = Cli::try_parse_from(["sf", "status", "-o", "json"]).unwrap();
    match cli.command {
        Commands::Status(args) => assert_eq!(args.output, StatusOutput::Json),
        other => panic!("expected status, got {other:?}"),
    }
}

#[test]
fn test_rollback_last_subcommand_name() {
    let cli = Cli::try_parse_from(["sf", "rollback-last"]).unwrap();
    assert!(matches!(cli.command, Commands::RollbackLast));
}
