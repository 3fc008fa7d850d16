//! Backend selection from configuration.

use crate::duckdb::DuckDbBackend;
use crate::error::DbResult;
use crate::sqlite::SqliteBackend;
use crate::traits::Database;
use wm_core::{DatabaseConfig, DbType};

/// Open the backend named by `config`.
///
/// `config.path` is used as given; resolve relative paths against the
/// project root first (see [`DatabaseConfig::with_root`]).
pub fn open_database(config: &DatabaseConfig) -> DbResult<Box<dyn Database>> {
    log::debug!("Opening {} database at {}", config.db_type, config.path);
    match config.db_type {
        DbType::DuckDb => Ok(Box::new(DuckDbBackend::new(&config.path)?)),
        DbType::Sqlite => Ok(Box::new(SqliteBackend::new(&config.path)?)),
    }
}
