use super::*;
use serial_test::serial;
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.migrations_dir, "migrations");
    assert_eq!(config.database.path, ":memory:");
    assert_eq!(config.ledger_table, "schema_migrations");
    assert!(config.lock.enabled);
    assert_eq!(config.lock.lease_seconds, 300);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
migrations_dir: db/migrations
database:
  path: ./app.duckdb
ledger_table: ops.schema_history
lock:
  enabled: false
  lease_seconds: 60
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.migrations_dir, "db/migrations");
    assert_eq!(config.database.path, "./app.duckdb");
    assert_eq!(config.ledger_table, "ops.schema_history");
    assert!(!config.lock.enabled);
    assert_eq!(config.lease(), Duration::from_secs(60));
}

#[test]
fn test_unknown_fields_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("migration_dir: typo");
    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_bad_ledger_table() {
    let config = Config {
        ledger_table: "schema_migrations; DROP TABLE users".to_string(),
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_rejects_zero_lease() {
    let mut config = Config::default();
    config.lock.lease_seconds = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_is_valid_table_name() {
    assert!(is_valid_table_name("schema_migrations"));
    assert!(is_valid_table_name("ops.schema_migrations"));
    assert!(is_valid_table_name("_t1"));
    assert!(!is_valid_table_name(""));
    assert!(!is_valid_table_name("1table"));
    assert!(!is_valid_table_name("a.b.c"));
    assert!(!is_valid_table_name("bad-name"));
    assert!(!is_valid_table_name("ops."));
}

#[test]
fn test_load_from_dir_without_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.migrations_dir, "migrations");
    assert_eq!(
        config.migrations_dir_absolute(dir.path()),
        dir.path().join("migrations")
    );
}

#[test]
fn test_load_from_dir_prefers_yml() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("schemaflow.yml"), "migrations_dir: sql").unwrap();
    fs::write(dir.path().join("schemaflow.yaml"), "migrations_dir: other").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.migrations_dir, "sql");
}

#[test]
fn test_load_reports_parse_error_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schemaflow.yml");
    fs::write(&path, "lock: [not, a, map]").unwrap();
    match Config::load(&path) {
        Err(CoreError::ConfigParseError { path: p, .. }) => {
            assert!(p.ends_with("schemaflow.yml"))
        }
        other => panic!("expected ConfigParseError, got {other:?}"),
    }
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        Config::load(&dir.path().join("nope.yml")),
        Err(CoreError::ConfigNotFound { .. })
    ));
}

#[test]
fn test_overrides_from_lookup() {
    let vars: HashMap<&str, &str> = [
        (ENV_MIGRATIONS_DIR, "override/migrations"),
        (ENV_DATABASE_PATH, "/tmp/app.duckdb"),
        (ENV_LEDGER_TABLE, ""),
    ]
    .into_iter()
    .collect();

    let config = Config::default()
        .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(config.migrations_dir, "override/migrations");
    assert_eq!(config.database.path, "/tmp/app.duckdb");
    // empty values are ignored
    assert_eq!(config.ledger_table, "schema_migrations");
}

#[test]
fn test_overrides_are_validated() {
    let result = Config::default().with_overrides(|k| {
        (k == ENV_LEDGER_TABLE).then(|| "not a table".to_string())
    });
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_env_overrides() {
    std::env::set_var(ENV_DATABASE_PATH, "env.duckdb");
    let config = Config::default().with_env_overrides();
    std::env::remove_var(ENV_DATABASE_PATH);

    assert_eq!(config.unwrap().database.path, "env.duckdb");
}

#[test]
#[serial]
fn test_env_overrides_absent() {
    std::env::remove_var(ENV_MIGRATIONS_DIR);
    std::env::remove_var(ENV_DATABASE_PATH);
    std::env::remove_var(ENV_LEDGER_TABLE);
    let config = Config::default().with_env_overrides().unwrap();
    assert_eq!(config.database.path, ":memory:");
}
