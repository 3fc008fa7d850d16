use super::*;

#[test]
fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[test]
fn test_new_handles_memory_path() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").unwrap();
}

#[test]
fn test_execute_with_params_and_query_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE kv (k VARCHAR PRIMARY KEY, v VARCHAR)")
        .unwrap();

    let inserted = db
        .execute("INSERT INTO kv (k, v) VALUES (?, ?)", &["a", "1"])
        .unwrap();
    assert_eq!(inserted, 1);
    db.execute("INSERT INTO kv (k, v) VALUES (?, NULL)", &["b"])
        .unwrap();

    let rows = db
        .query_rows("SELECT k, v FROM kv ORDER BY k", &[])
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
    let db = DuckDbBackend::in_memory().unwrap();
    let rows = db.query_rows("SELECT 42::BIGINT, 'x'", &[]).unwrap();
    assert_eq!(rows, vec![vec![Some("42".to_string()), Some("x".to_string())]]);
}

#[test]
fn test_duplicate_key_is_constraint_violation() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id VARCHAR PRIMARY KEY)")
        .unwrap();
    db.execute("INSERT INTO t VALUES (?)", &["x"]).unwrap();
    let err = db.execute("INSERT INTO t VALUES (?)", &["x"]).unwrap_err();
    assert!(
        matches!(err, DbError::ConstraintViolation(_)),
        "unexpected error: {err:?}"
    );
}

#[test]
fn test_transaction_commit_and_rollback() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").unwrap();

    db.begin().unwrap();
    db.execute_batch("INSERT INTO t VALUES (1)").unwrap();
    db.rollback().unwrap();
    assert!(db.query_rows("SELECT id FROM t", &[]).unwrap().is_empty());

    db.begin().unwrap();
    db.execute_batch("INSERT INTO t VALUES (2)").unwrap();
    db.commit().unwrap();
    assert_eq!(db.query_rows("SELECT id FROM t", &[]).unwrap().len(), 1);
}

#[test]
fn test_ddl_is_transactional() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.begin().unwrap();
    db.execute_batch("CREATE TABLE ephemeral (id INT)").unwrap();
    db.rollback().unwrap();
    let err = db.query_rows("SELECT * FROM ephemeral", &[]).unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));
}

#[test]
fn test_lock_is_noop() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.acquire_lock().unwrap();
    db.release_lock().unwrap();
}

#[test]
fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (7);")
            .unwrap();
    }
    let db = DuckDbBackend::from_path(&path).unwrap();
    let rows = db.query_rows("SELECT id FROM t", &[]).unwrap();
    assert_eq!(rows, vec![vec![Some("7".to_string())]]);
}
