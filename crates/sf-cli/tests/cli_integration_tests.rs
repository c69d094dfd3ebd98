//! End-to-end tests for the `sf` binary

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled sf binary
fn sf_bin() -> String {
    env!("CARGO_BIN_EXE_sf").to_string()
}

/// Run `sf` inside `project` and return (stdout, stderr, exit code).
fn run_sf(project: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    let output = Command::new(sf_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("SF_MIGRATIONS_DIR")
        .env_remove("SF_DATABASE_PATH")
        .env_remove("SF_LEDGER_TABLE")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute sf with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code(),
    )
}

/// Project with a file database and three reversible migrations
fn sample_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(
        dir.path().join("schemaflow.yml"),
        "database:\n  path: app.duckdb\n",
    )
    .unwrap();
    for (name, body) in [
        ("001_create_users_table.sql", "CREATE TABLE users (id INTEGER, email VARCHAR);"),
        ("001_down_create_users_table.sql", "DROP TABLE users;"),
        ("002_create_orders_table.sql", "CREATE TABLE orders (id INTEGER);"),
        ("002_down_create_orders_table.sql", "DROP TABLE orders;"),
        ("003_seed_users.sql", "INSERT INTO users VALUES (1, 'a@example.com');"),
        ("003_down_seed_users.sql", "DELETE FROM users;"),
    ] {
        fs::write(migrations.join(name), body).unwrap();
    }
    dir
}

// ── Commands ───────────────────────────────────────────────────────────

#[test]
fn test_up_then_status() {
    let project = sample_project();

    let (stdout, stderr, code) = run_sf(project.path(), &["up"]);
    assert_eq!(code, Some(0), "stderr: {stderr}");
    assert!(stdout.contains("✓ 001_create_users_table"));
    assert!(stdout.contains("Applied 3 migrations"));

    let (stdout, _, code) = run_sf(project.path(), &["up"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("No pending migrations"));

    let (stdout, _, code) = run_sf(project.path(), &["status"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("Executed migrations (3):"));
    assert!(stdout.contains("All migrations are up to date!"));
}

#[test]
fn test_status_json() {
    let project = sample_project();

    let (stdout, stderr, code) =
        run_sf(project.path(), &["status", "--output", "json"]);
    assert_eq!(code, Some(0), "stderr: {stderr}");
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["applied"].as_array().unwrap().len(), 0);
    assert_eq!(json["pending"].as_array().unwrap().len(), 3);
    assert_eq!(json["pending"][0]["filename"], "001_create_users_table.sql");
}

#[test]
fn test_down_and_rollback_last() {
    let project = sample_project();
    run_sf(project.path(), &["up"]);

    let (stdout, stderr, code) = run_sf(
        project.path(),
        &["down", "--target", "001_create_users_table"],
    );
    assert_eq!(code, Some(0), "stderr: {stderr}");
    assert!(stdout.contains("Rolled back 2 migrations"));

    let (stdout, _, code) = run_sf(project.path(), &["rollback-last"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("Rolled back 001_create_users_table"));

    let (stdout, _, code) = run_sf(project.path(), &["rollback-last"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("No migrations to roll back"));
}

#[test]
fn test_verify_reports_tampering() {
    let project = sample_project();
    run_sf(project.path(), &["up"]);

    let (stdout, _, code) = run_sf(project.path(), &["verify"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("Verified 3 migration checksums"));

    fs::write(
        project.path().join("migrations/002_create_orders_table.sql"),
        "CREATE TABLE orders (id BIGINT);",
    )
    .unwrap();
    let (_, stderr, code) = run_sf(project.path(), &["verify"]);
    assert_eq!(code, Some(2));
    assert!(stderr.contains("[MG007]"));
    assert!(stderr.contains("002_create_orders_table"));
}

#[test]
fn test_failing_migration_exits_non_zero() {
    let project = sample_project();
    fs::write(
        project.path().join("migrations/004_broken.sql"),
        "CREATE TABLE (;",
    )
    .unwrap();

    let (_, stderr, code) = run_sf(project.path(), &["up"]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("[MG004]"));
    assert!(stderr.contains("004_broken.sql"));

    let (stdout, _, _) = run_sf(project.path(), &["status"]);
    assert!(stdout.contains("Executed migrations (3):"));
    assert!(stdout.contains("○ 004_broken (004_broken.sql)"));
}

#[test]
fn test_missing_migrations_dir() {
    let project = sample_project();
    let (_, stderr, code) = run_sf(project.path(), &["up", "--dir", "nope"]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("[MG001]"));
}
