//! wm-db - Database abstraction layer for Waymark
//!
//! This crate provides the narrow `Database` trait the migration engine
//! needs (statement execution, string-row queries, transactions, and a
//! connection-scoped advisory lock), a `Transaction` guard that rolls back
//! on drop and interrupts statements that outlive their deadline, and
//! DuckDB and SQLite implementations.

pub mod connect;
pub mod context;
pub mod duckdb;
pub mod error;
pub mod lock;
pub(crate) mod row_helpers;
pub mod sqlite;
pub mod traits;
pub mod transaction;
pub(crate) mod watchdog;

pub use connect::open_database;
pub use context::{CancelHandle, RunContext};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use lock::LockGuard;
pub use sqlite::SqliteBackend;
pub use traits::{Database, Interrupt, Row};
pub use transaction::Transaction;
