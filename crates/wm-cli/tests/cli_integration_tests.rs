//! Integration tests for the `wm` binary
//!
//! Each test builds a throwaway project (waymark.yml plus a migrations
//! directory) and drives the CLI against a SQLite or DuckDB file in it.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled wm binary
fn wm_bin() -> String {
    env!("CARGO_BIN_EXE_wm").to_string()
}

/// Run `wm -p <project> <args>` and return (stdout, stderr, success).
fn run_wm(project: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(wm_bin())
        .arg("-p")
        .arg(project)
        .args(args)
        .env_remove("WM_TARGET")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute wm with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn write_migration(project: &Path, dir_name: &str, up: &str, down: Option<&str>) {
    let dir = project.join("migrations").join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("up.sql"), up).unwrap();
    if let Some(down) = down {
        fs::write(dir.join("down.sql"), down).unwrap();
    }
}

/// A project with two reversible migrations on the given backend.
fn project(db_type: &str, db_file: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("waymark.yml"),
        format!(
            "name: shop\n\
             database:\n  type: {db_type}\n  path: {db_file}\n\
             targets:\n  scratch:\n    database:\n      type: {db_type}\n      path: scratch.db\n"
        ),
    )
    .unwrap();
    write_migration(
        temp.path(),
        "2021-03-10T051621Z_create_customers",
        "CREATE TABLE customers (id INTEGER, name VARCHAR);",
        Some("DROP TABLE customers;"),
    );
    write_migration(
        temp.path(),
        "2021-04-01T000000Z_create_orders",
        "CREATE TABLE orders (id INTEGER, customer_id INTEGER);",
        Some("DROP TABLE orders;"),
    );
    temp
}

// ── Happy path ─────────────────────────────────────────────────────────

#[test]
fn test_migrate_status_rollback_sqlite() {
    let temp = project("sqlite", "shop.sqlite");
    let dir = temp.path();

    let (stdout, _, ok) = run_wm(dir, &["pending"]);
    assert!(ok);
    assert!(stdout.contains("2021-03-10T05:16:21Z"));
    assert!(stdout.contains("create_orders"));

    let (stdout, stderr, ok) = run_wm(dir, &["migrate"]);
    assert!(ok, "migrate failed: {stderr}");
    assert!(stdout.contains("Applied 2 migration(s)."), "{stdout}");
    assert!(dir.join("shop.sqlite").exists());

    let (stdout, _, ok) = run_wm(dir, &["migrate"]);
    assert!(ok);
    assert!(stdout.contains("Database is up to date."));

    let (stdout, _, ok) = run_wm(dir, &["status"]);
    assert!(ok);
    assert!(stdout.contains("\u{2714}"));
    assert!(stdout.contains("2 applied, 0 pending"), "{stdout}");

    let (stdout, _, ok) = run_wm(dir, &["rollback", "2021-04-01T00:00:00Z"]);
    assert!(ok);
    assert!(stdout.contains("Rolled back 1 migration(s)."));

    let (stdout, _, ok) = run_wm(dir, &["pending"]);
    assert!(ok);
    assert!(stdout.contains("create_orders"));
    assert!(!stdout.contains("create_customers"));

    let (_, _, ok) = run_wm(dir, &["rollback", "--all"]);
    assert!(ok);
    let (stdout, _, _) = run_wm(dir, &["status"]);
    assert!(stdout.contains("0 applied, 2 pending"), "{stdout}");
}

#[test]
fn test_migrate_to_version_duckdb() {
    let temp = project("duckdb", "shop.duckdb");
    let dir = temp.path();

    let (stdout, stderr, ok) = run_wm(dir, &["migrate", "--to", "2021-03-10T051621Z"]);
    assert!(ok, "migrate failed: {stderr}");
    assert!(stdout.contains("Applied 1 migration(s)."), "{stdout}");

    let (stdout, _, ok) = run_wm(dir, &["status", "--output", "json"]);
    assert!(ok);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let migrations = report["migrations"].as_array().unwrap();
    assert_eq!(migrations.len(), 2);
    assert_eq!(migrations[0]["state"], "applied");
    assert_eq!(migrations[0]["version"], "2021-03-10T05:16:21Z");
    assert_eq!(migrations[1]["state"], "pending");
    assert!(migrations[1]["applied_at"].is_null());
}

#[test]
fn test_target_selects_other_database() {
    let temp = project("sqlite", "shop.sqlite");
    let dir = temp.path();

    let (_, stderr, ok) = run_wm(dir, &["--target", "scratch", "migrate"]);
    assert!(ok, "{stderr}");
    assert!(dir.join("scratch.db").exists());
    assert!(!dir.join("shop.sqlite").exists());

    let (_, stderr, ok) = run_wm(dir, &["--target", "nope", "status"]);
    assert!(!ok);
    assert!(stderr.contains("Available targets: scratch"), "{stderr}");
}

// ── Failures ───────────────────────────────────────────────────────────

#[test]
fn test_failed_migration_reports_version_and_exits_non_zero() {
    let temp = project("sqlite", "shop.sqlite");
    let dir = temp.path();
    write_migration(
        dir,
        "2021-05-01T000000Z_broken",
        "CREATE TABLE half (id INTEGER); INSERT INTO missing VALUES (1);",
        None,
    );

    let (stdout, stderr, ok) = run_wm(dir, &["migrate"]);
    assert!(!ok);
    assert!(stdout.contains("create_orders"));
    assert!(
        stderr.contains("Migration 2021-05-01T00:00:00Z (broken) failed while migrating up"),
        "{stderr}"
    );

    let (stdout, _, _) = run_wm(dir, &["pending"]);
    assert!(stdout.contains("broken"));
    assert!(!stdout.contains("create_orders"));
}

#[test]
fn test_irreversible_rollback_refused() {
    let temp = project("sqlite", "shop.sqlite");
    let dir = temp.path();
    write_migration(
        dir,
        "2021-05-01T000000Z_Initial",
        "CREATE TABLE base (id INTEGER);",
        None,
    );
    let (_, _, ok) = run_wm(dir, &["migrate"]);
    assert!(ok);

    let (_, stderr, ok) = run_wm(dir, &["rollback", "2021-05-01"]);
    assert!(!ok);
    assert!(stderr.contains("is irreversible"), "{stderr}");
}

#[test]
fn test_verify_and_policy_on_edited_migration() {
    let temp = project("sqlite", "shop.sqlite");
    let dir = temp.path();
    let (_, _, ok) = run_wm(dir, &["migrate"]);
    assert!(ok);

    let (stdout, _, ok) = run_wm(dir, &["verify"]);
    assert!(ok);
    assert!(stdout.contains("Ledger is consistent with 2 migration(s)."));

    fs::write(
        dir.join("migrations/2021-03-10T051621Z_create_customers/up.sql"),
        "CREATE TABLE customers (id BIGINT);",
    )
    .unwrap();

    let (_, stderr, ok) = run_wm(dir, &["verify"]);
    assert!(!ok);
    assert!(stderr.contains("create_customers"), "{stderr}");
    assert!(stderr.contains("changed after it was applied"), "{stderr}");

    // Default policy refuses to touch the database.
    let (_, stderr, ok) = run_wm(dir, &["rollback", "--all"]);
    assert!(!ok);
    assert!(stderr.contains("wm verify"), "{stderr}");
}

#[test]
fn test_missing_config() {
    let temp = TempDir::new().unwrap();
    let (_, stderr, ok) = run_wm(temp.path(), &["status"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to load project configuration"), "{stderr}");
}

// ── Scaffolding ────────────────────────────────────────────────────────

#[test]
fn test_new_creates_migration_directory() {
    let temp = project("sqlite", "shop.sqlite");
    let dir = temp.path();

    let (stdout, stderr, ok) = run_wm(dir, &["new", "add_refunds", "Track", "refunds"]);
    assert!(ok, "{stderr}");
    assert!(stdout.starts_with("Created "));

    let created: Vec<_> = fs::read_dir(dir.join("migrations"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with("_add_refunds"))
        .collect();
    assert_eq!(created.len(), 1);
    let meta = fs::read_to_string(dir.join("migrations").join(&created[0]).join("migration.yml"))
        .unwrap();
    assert!(meta.contains("Track refunds"));

    let (stdout, _, _) = run_wm(dir, &["pending"]);
    assert!(stdout.contains("add_refunds"));

    let (_, stderr, ok) = run_wm(dir, &["new", "bad name"]);
    assert!(!ok);
    assert!(stderr.contains("Invalid migration name"), "{stderr}");
}
