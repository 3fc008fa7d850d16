//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::row_helpers::duckdb_cell;
use crate::traits::{Database, Interrupt, Row};
use duckdb::{Connection, InterruptHandle};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
    interrupt: Arc<InterruptHandle>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            DbError::ConnectionError(format!("{}: {}", e, path.display()))
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        let interrupt = conn.interrupt_handle();
        Self {
            conn: Mutex::new(conn),
            interrupt,
        }
    }

    fn connection(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

impl Database for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    fn execute(&self, sql: &str, params: &[&str]) -> DbResult<usize> {
        let conn = self.connection()?;
        let affected = conn.execute(sql, duckdb::params_from_iter(params.iter()))?;
        Ok(affected)
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn query_rows(&self, sql: &str, params: &[&str]) -> DbResult<Vec<Row>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        // DuckDB panics on `stmt.column_count()` before execution, so the
        // column count is read from each row instead.
        let rows = stmt
            .query_map(duckdb::params_from_iter(params.iter()), |row| {
                let col_count = row.as_ref().column_count();
                Ok((0..col_count).map(|i| duckdb_cell(row, i)).collect::<Row>())
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // A read-write DuckDB file is locked exclusively by the process that
    // opened it for the life of the connection, and an in-memory database is
    // private to its connection, so there is nothing further to acquire.
    fn acquire_lock(&self) -> DbResult<()> {
        log::debug!("DuckDB connection is exclusive; no advisory lock needed");
        Ok(())
    }

    fn interrupt_handle(&self) -> Option<Arc<dyn Interrupt>> {
        let handle: Arc<dyn Interrupt> = self.interrupt.clone();
        Some(handle)
    }
}

impl Interrupt for InterruptHandle {
    fn interrupt(&self) {
        InterruptHandle::interrupt(self);
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
