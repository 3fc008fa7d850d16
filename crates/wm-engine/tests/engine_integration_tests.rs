//! End-to-end tests: SQL migration directories on disk applied to file
//! databases, plus the ordering property over arbitrary registrations.

use quickcheck_macros::quickcheck;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wm_core::{MigrationName, MigrationVersion};
use wm_db::{Database, DuckDbBackend, SqliteBackend};
use wm_engine::{
    load_registry, scaffold_migration, Inconsistency, Migration, Registry, Runner, SqlMigration,
    StateChange,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn write_migration(root: &Path, dir_name: &str, up: &str, down: Option<&str>) -> PathBuf {
    let dir = root.join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("up.sql"), up).unwrap();
    if let Some(down) = down {
        fs::write(dir.join("down.sql"), down).unwrap();
    }
    dir
}

fn project() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    write_migration(
        &migrations,
        "2021-03-10T051621Z_Initial",
        "CREATE TABLE accounts (id INTEGER PRIMARY KEY, email VARCHAR NOT NULL);",
        None,
    );
    write_migration(
        &migrations,
        "2021-04-02T120000Z_add_orders",
        "CREATE TABLE orders (id INTEGER, account_id INTEGER NOT NULL);\n\
         INSERT INTO orders VALUES (1, 1);",
        Some("DROP TABLE orders;"),
    );
    write_migration(
        &migrations,
        "2021-05-20T080000Z_order_notes",
        "ALTER TABLE orders ADD COLUMN note VARCHAR;",
        Some("ALTER TABLE orders DROP COLUMN note;"),
    );
    (temp, migrations)
}

fn applied_names(db: &dyn Database) -> Vec<String> {
    db.query_rows(
        "SELECT name FROM _waymark_migrations ORDER BY version",
        &[],
    )
    .unwrap()
    .into_iter()
    .map(|row| row[0].clone().unwrap())
    .collect()
}

fn full_lifecycle(db: &dyn Database, migrations: &Path) {
    let registry = load_registry(&[migrations.to_path_buf()]).unwrap();
    let runner = Runner::new(&registry, db);

    assert_eq!(runner.pending().unwrap().len(), 3);
    assert_eq!(runner.apply_all().unwrap().len(), 3);
    assert_eq!(
        applied_names(db),
        vec!["Initial", "add_orders", "order_notes"]
    );
    assert!(runner.verify().unwrap().is_empty());

    let orders = db.query_rows("SELECT COUNT(*) FROM orders", &[]).unwrap();
    assert_eq!(orders[0][0].as_deref(), Some("1"));

    let initial = MigrationVersion::parse("2021-03-10T05:16:21Z").unwrap();
    let reverted = runner.rollback_to(initial).unwrap();
    assert_eq!(reverted.len(), 2);
    assert_eq!(applied_names(db), vec!["Initial"]);
    assert!(db.query_rows("SELECT COUNT(*) FROM orders", &[]).is_err());

    assert_eq!(runner.apply_all().unwrap().len(), 2);
    assert_eq!(applied_names(db).len(), 3);
}

// ── Backends ───────────────────────────────────────────────────────────

#[test]
fn test_duckdb_file_lifecycle() {
    let (temp, migrations) = project();
    let path = temp.path().join("app.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        full_lifecycle(&db, &migrations);
    }

    // The ledger survives reopening the file.
    let db = DuckDbBackend::from_path(&path).unwrap();
    let registry = load_registry(&[migrations]).unwrap();
    assert!(Runner::new(&registry, &db).pending().unwrap().is_empty());
}

#[test]
fn test_sqlite_file_lifecycle() {
    let (temp, migrations) = project();
    let path = temp.path().join("app.sqlite");
    {
        let db = SqliteBackend::from_path(&path).unwrap();
        full_lifecycle(&db, &migrations);
    }

    let db = SqliteBackend::from_path(&path).unwrap();
    let registry = load_registry(&[migrations]).unwrap();
    assert!(Runner::new(&registry, &db).pending().unwrap().is_empty());
}

#[test]
fn test_edited_file_is_detected() {
    let (_temp, migrations) = project();
    let db = SqliteBackend::in_memory().unwrap();
    {
        let registry = load_registry(&[migrations.clone()]).unwrap();
        Runner::new(&registry, &db).apply_all().unwrap();
    }

    fs::write(
        migrations.join("2021-04-02T120000Z_add_orders/up.sql"),
        "CREATE TABLE orders (id BIGINT PRIMARY KEY);",
    )
    .unwrap();

    let registry = load_registry(&[migrations]).unwrap();
    let found = Runner::new(&registry, &db).verify().unwrap();
    assert_eq!(found.len(), 1);
    assert!(matches!(
        &found[0],
        Inconsistency::ChecksumMismatch { name, .. } if name == "add_orders"
    ));
}

#[test]
fn test_scaffolded_migration_is_picked_up() {
    let (_temp, migrations) = project();
    let name = MigrationName::new("add_refunds").unwrap();
    let version = MigrationVersion::from_ymd_hms(2021, 6, 1, 0, 0, 0).unwrap();
    let dir = scaffold_migration(&migrations, &name, "Track refunds", version).unwrap();
    fs::write(dir.join("up.sql"), "CREATE TABLE refunds (id INTEGER);").unwrap();
    fs::write(dir.join("down.sql"), "DROP TABLE refunds;").unwrap();

    let db = DuckDbBackend::in_memory().unwrap();
    let registry = load_registry(&[migrations]).unwrap();
    let runner = Runner::new(&registry, &db);
    assert_eq!(runner.apply_all().unwrap().last(), Some(&version));

    runner.rollback(version).unwrap();
    let pending = runner.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "add_refunds");
}

#[test]
fn test_observer_reports_rollback_states() {
    let (_temp, migrations) = project();
    let db = SqliteBackend::in_memory().unwrap();
    let registry = load_registry(&[migrations]).unwrap();
    let seen = RefCell::new(Vec::new());
    let runner = Runner::new(&registry, &db)
        .with_observer(|c: &StateChange| seen.borrow_mut().push(c.state.to_string()));

    runner.apply_all().unwrap();
    seen.borrow_mut().clear();
    let latest = registry.latest().unwrap().version();
    runner.rollback(latest).unwrap();
    assert_eq!(*seen.borrow(), vec!["rolling back", "pending"]);
}

// ── Properties ─────────────────────────────────────────────────────────

/// Registering versions in any order applies them ascending.
#[quickcheck]
fn prop_apply_all_is_ascending(offsets: Vec<u32>) -> bool {
    let base = MigrationVersion::from_ymd_hms(2020, 1, 1, 0, 0, 0)
        .unwrap()
        .as_datetime();
    let mut seen = std::collections::HashSet::new();
    let mut registry = Registry::new();
    for (i, offset) in offsets.iter().enumerate() {
        if !seen.insert(*offset) {
            continue;
        }
        let at = base + chrono::Duration::seconds(i64::from(*offset));
        let version = MigrationVersion::from_datetime(at).unwrap();
        let name = MigrationName::new(format!("m{i}")).unwrap();
        let migration: Box<dyn Migration> = Box::new(SqlMigration::new(
            version,
            name,
            "CREATE TABLE IF NOT EXISTS noop (id INT)",
        ));
        registry.register(migration).unwrap();
    }

    let db = SqliteBackend::in_memory().unwrap();
    let runner = Runner::new(&registry, &db);
    let applied = runner.apply_all().unwrap();
    let mut sorted = applied.clone();
    sorted.sort();
    applied == sorted && applied.len() == seen.len() && runner.apply_all().unwrap().is_empty()
}
