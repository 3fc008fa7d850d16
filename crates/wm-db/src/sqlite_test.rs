use super::*;

#[test]
fn test_in_memory() {
    let db = SqliteBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "sqlite");
}

#[test]
fn test_execute_with_params_and_query_rows() {
    let db = SqliteBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE kv (k VARCHAR PRIMARY KEY, v VARCHAR)")
        .unwrap();
    db.execute("INSERT INTO kv (k, v) VALUES (?1, ?2)", &["a", "1"])
        .unwrap();
    db.execute("INSERT INTO kv (k, v) VALUES (?1, NULL)", &["b"])
        .unwrap();

    let rows = db
        .query_rows("SELECT k, v FROM kv WHERE k >= ?1 ORDER BY k", &["a"])
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Some("a".to_string()), Some("1".to_string())],
            vec![Some("b".to_string()), None],
        ]
    );
}

#[test]
fn test_query_rows_renders_numbers() {
    let db = SqliteBackend::in_memory().unwrap();
    let rows = db.query_rows("SELECT 42, 'x'", &[]).unwrap();
    assert_eq!(rows, vec![vec![Some("42".to_string()), Some("x".to_string())]]);
}

#[test]
fn test_duplicate_key_is_constraint_violation() {
    let db = SqliteBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id VARCHAR PRIMARY KEY)")
        .unwrap();
    db.execute("INSERT INTO t VALUES (?1)", &["x"]).unwrap();
    let err = db.execute("INSERT INTO t VALUES (?1)", &["x"]).unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));
}

#[test]
fn test_ddl_rolls_back() {
    let db = SqliteBackend::in_memory().unwrap();
    db.begin().unwrap();
    db.execute_batch("CREATE TABLE ephemeral (id INT)").unwrap();
    db.rollback().unwrap();
    assert!(db.query_rows("SELECT * FROM ephemeral", &[]).is_err());
}

#[test]
fn test_lock_excludes_second_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.sqlite");
    let first = SqliteBackend::from_path(&path).unwrap();
    let second = SqliteBackend::from_path(&path).unwrap();
    second
        .set_busy_timeout(Duration::from_millis(50))
        .unwrap();

    first.acquire_lock().unwrap();
    let err = second.acquire_lock().unwrap_err();
    assert!(matches!(err, DbError::LockUnavailable(_)), "got {err:?}");

    // The lock holder can still work normally
    first.execute_batch("CREATE TABLE t (id INT)").unwrap();

    first.release_lock().unwrap();
    second.acquire_lock().unwrap();
    second.release_lock().unwrap();
}

#[test]
fn test_lock_released_when_connection_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.sqlite");
    {
        let first = SqliteBackend::from_path(&path).unwrap();
        first.acquire_lock().unwrap();
    }
    let second = SqliteBackend::from_path(&path).unwrap();
    second
        .set_busy_timeout(Duration::from_millis(50))
        .unwrap();
    second.acquire_lock().unwrap();
}
