use super::*;
use sf_db::{Database, DuckDbBackend};

fn setup() -> (DuckDbBackend, MigrationLedger) {
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = MigrationLedger::default();
    ledger.ensure_schema(&db).unwrap();
    (db, ledger)
}

fn count(db: &DuckDbBackend, sql: &str) -> i64 {
    db.query(sql, &[]).unwrap()[0].integer(0).unwrap()
}

#[test]
fn test_ensure_schema_creates_table_and_index() {
    let (db, ledger) = setup();
    assert!(ledger.exists(&db).unwrap());
    assert!(db.column_exists("schema_migrations", "checksum").unwrap());
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM duckdb_indexes() WHERE index_name = 'idx_schema_migrations_executed_at'"
        ),
        1
    );
}

#[test]
fn test_ensure_schema_is_idempotent() {
    let (db, ledger) = setup();
    ledger.record_applied(&db, "001_a", "abc").unwrap();
    ledger.ensure_schema(&db).unwrap();
    ledger.ensure_schema(&db).unwrap();
    assert_eq!(ledger.list_applied(&db).unwrap().len(), 1);
}

#[test]
fn test_exists_before_ensure_schema() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!MigrationLedger::default().exists(&db).unwrap());
}

#[test]
fn test_record_and_list_applied() {
    let (db, ledger) = setup();
    ledger.record_applied(&db, "002_b", "bbb").unwrap();
    ledger.record_applied(&db, "001_a", "aaa").unwrap();

    let applied = ledger.list_applied(&db).unwrap();
    let pairs: Vec<(&str, &str)> = applied
        .iter()
        .map(|(v, c)| (v.as_str(), c.as_str()))
        .collect();
    assert_eq!(pairs, vec![("001_a", "aaa"), ("002_b", "bbb")]);
}

#[test]
fn test_entries_have_server_timestamp() {
    let (db, ledger) = setup();
    let before = Utc::now() - chrono::Duration::minutes(5);
    ledger.record_applied(&db, "001_a", "aaa").unwrap();

    let entries = ledger.entries(&db).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "001_a");
    assert!(entries[0].executed_at > before);
    assert!(!entries[0].is_legacy());
}

#[test]
fn test_duplicate_version_rejected() {
    let (db, ledger) = setup();
    ledger.record_applied(&db, "001_a", "aaa").unwrap();
    match ledger.record_applied(&db, "001_a", "other") {
        Err(MigrateError::DuplicateVersion { version }) => assert_eq!(version, "001_a"),
        other => panic!("expected DuplicateVersion, got {other:?}"),
    }
    // original checksum untouched
    assert_eq!(ledger.list_applied(&db).unwrap()["001_a"], "aaa");
}

#[test]
fn test_remove_applied() {
    let (db, ledger) = setup();
    ledger.record_applied(&db, "001_a", "aaa").unwrap();
    ledger.remove_applied(&db, "001_a").unwrap();
    assert!(ledger.list_applied(&db).unwrap().is_empty());
}

#[test]
fn test_remove_missing_version_is_error() {
    let (db, ledger) = setup();
    match ledger.remove_applied(&db, "009_missing") {
        Err(MigrateError::MissingLedgerEntry { version }) => assert_eq!(version, "009_missing"),
        other => panic!("expected MissingLedgerEntry, got {other:?}"),
    }
}

#[test]
fn test_record_inside_rolled_back_transaction_leaves_no_row() {
    let (mut db, ledger) = setup();
    {
        let tx = db.begin().unwrap();
        ledger.record_applied(&*tx, "001_a", "aaa").unwrap();
    }
    assert!(ledger.list_applied(&db).unwrap().is_empty());
}

#[test]
fn test_legacy_table_gains_checksum_column() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE schema_migrations (
             version VARCHAR PRIMARY KEY,
             executed_at TIMESTAMP DEFAULT now()
         );
         INSERT INTO schema_migrations (version) VALUES ('001_a'), ('002_b');",
    )
    .unwrap();

    let ledger = MigrationLedger::default();
    ledger.ensure_schema(&db).unwrap();

    let entries = ledger.entries(&db).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(LedgerEntry::is_legacy));
    assert!(entries.iter().all(|e| e.checksum == LEGACY_CHECKSUM));
}

#[test]
fn test_null_checksums_backfilled() {
    let (db, ledger) = setup();
    db.execute(
        "INSERT INTO schema_migrations (version, checksum) VALUES ('001_a', NULL)",
        &[],
    )
    .unwrap();
    ledger.ensure_schema(&db).unwrap();
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM schema_migrations WHERE checksum = 'legacy_migration_no_checksum_available'"
        ),
        1
    );
}

#[test]
fn test_schema_qualified_ledger() {
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = MigrationLedger::new("ops.schema_history").unwrap();
    ledger.ensure_schema(&db).unwrap();
    ledger.ensure_schema(&db).unwrap();
    ledger.record_applied(&db, "001_a", "aaa").unwrap();
    assert!(db.relation_exists("ops.schema_history").unwrap());
    assert_eq!(ledger.list_applied(&db).unwrap().len(), 1);
}

#[test]
fn test_invalid_table_name_rejected() {
    assert!(matches!(
        MigrationLedger::new("schema_migrations; DROP TABLE x"),
        Err(MigrateError::InvalidTableName(_))
    ));
}
