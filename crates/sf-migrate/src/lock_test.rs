use super::*;
use sf_db::DuckDbBackend;

fn lock(holder: &str, lease: Duration) -> MigrationLock {
    MigrationLock::with_holder("schema_migrations", LockOptions { lease }, holder)
}

#[test]
fn test_lock_table_name_follows_ledger() {
    let l = MigrationLock::new("ops.history", LockOptions::default());
    assert_eq!(l.table(), "ops.history_lock");
}

#[test]
fn test_new_holders_are_unique() {
    let a = MigrationLock::new("schema_migrations", LockOptions::default());
    let b = MigrationLock::new("schema_migrations", LockOptions::default());
    assert_ne!(a.holder(), b.holder());
    assert!(a.holder().ends_with(&format!(":{}", std::process::id())));
}

#[test]
fn test_acquire_and_release() {
    let db = DuckDbBackend::in_memory().unwrap();
    let l = lock("runner-a", DEFAULT_LEASE);

    l.acquire(&db).unwrap();
    let lease = l.current(&db).unwrap().unwrap();
    assert_eq!(lease.holder, "runner-a");
    assert!(lease.expires_at > lease.acquired_at);

    assert!(l.release(&db).unwrap());
    assert!(l.current(&db).unwrap().is_none());
}

#[test]
fn test_second_holder_is_rejected() {
    let db = DuckDbBackend::in_memory().unwrap();
    let a = lock("runner-a", DEFAULT_LEASE);
    let b = lock("runner-b", DEFAULT_LEASE);

    a.acquire(&db).unwrap();
    let err = b.acquire(&db).unwrap_err();
    match err {
        MigrateError::LockHeld { holder, .. } => assert_eq!(holder, "runner-a"),
        other => panic!("expected LockHeld, got {other:?}"),
    }

    // rejected holder cannot release someone else's lease
    assert!(!b.release(&db).unwrap());
    assert_eq!(a.current(&db).unwrap().unwrap().holder, "runner-a");
}

#[test]
fn test_reacquire_after_release() {
    let db = DuckDbBackend::in_memory().unwrap();
    let a = lock("runner-a", DEFAULT_LEASE);
    let b = lock("runner-b", DEFAULT_LEASE);

    a.acquire(&db).unwrap();
    a.release(&db).unwrap();
    b.acquire(&db).unwrap();
    assert_eq!(b.current(&db).unwrap().unwrap().holder, "runner-b");
}

#[test]
fn test_expired_lease_is_taken_over() {
    let db = DuckDbBackend::in_memory().unwrap();
    let stale = lock("crashed", Duration::ZERO);
    let fresh = lock("runner-b", DEFAULT_LEASE);

    stale.acquire(&db).unwrap();
    fresh.acquire(&db).unwrap();
    assert_eq!(fresh.current(&db).unwrap().unwrap().holder, "runner-b");
}

#[test]
fn test_current_without_lease() {
    let db = DuckDbBackend::in_memory().unwrap();
    let l = lock("runner-a", DEFAULT_LEASE);
    l.acquire(&db).unwrap();
    l.release(&db).unwrap();
    assert!(l.current(&db).unwrap().is_none());
}
