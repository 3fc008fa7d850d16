//! SQLite database backend implementation

use crate::error::{DbError, DbResult};
use crate::row_helpers::sqlite_cell;
use crate::traits::{Database, Interrupt, Row};
use rusqlite::{Connection, InterruptHandle};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// SQLite database backend
///
/// Uses the default rollback journal so that `locking_mode = EXCLUSIVE`
/// holds a plain file lock for the advisory migration lock.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    interrupt: Arc<InterruptHandle>,
}

impl SqliteBackend {
    /// Create a new in-memory SQLite connection
    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DbError::ConnectionError(format!("failed to open in-memory database: {e}"))
        })?;
        Self::from_connection(conn)
    }

    /// Create a new SQLite connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            DbError::ConnectionError(format!("failed to open {}: {e}", path.display()))
        })?;
        Self::from_connection(conn)
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| DbError::ConnectionError(format!("failed to set pragmas: {e}")))?;
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Ok(Self {
            conn: Mutex::new(conn),
            interrupt,
        })
    }

    /// How long a statement waits for another connection's lock before
    /// failing with [`DbError::LockUnavailable`].
    pub fn set_busy_timeout(&self, timeout: Duration) -> DbResult<()> {
        let conn = self.connection()?;
        conn.busy_timeout(timeout)?;
        Ok(())
    }

    fn connection(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

impl Database for SqliteBackend {
    fn db_type(&self) -> &'static str {
        "sqlite"
    }

    fn execute(&self, sql: &str, params: &[&str]) -> DbResult<usize> {
        let conn = self.connection()?;
        let affected = conn.execute(sql, rusqlite::params_from_iter(params.iter()))?;
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
        let col_count = stmt.column_count();
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok((0..col_count).map(|i| sqlite_cell(row, i)).collect::<Row>())
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // In EXCLUSIVE locking mode SQLite keeps the file lock taken by the
    // first write transaction until the mode is reset, so the lock lives
    // exactly as long as this connection (or process) does.
    fn acquire_lock(&self) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch("PRAGMA locking_mode = EXCLUSIVE;")?;
        if let Err(err) = conn.execute_batch("BEGIN EXCLUSIVE; COMMIT;") {
            if let Err(e) = conn.execute_batch("ROLLBACK;") {
                log::warn!("Failed to roll back after lock attempt: {e}");
            }
            if let Err(e) = conn.execute_batch("PRAGMA locking_mode = NORMAL;") {
                log::warn!("Failed to reset SQLite locking mode: {e}");
            }
            return Err(match DbError::from(err) {
                DbError::LockUnavailable(msg) => DbError::LockUnavailable(msg),
                other => DbError::LockUnavailable(other.to_string()),
            });
        }
        log::debug!("Acquired exclusive SQLite lock");
        Ok(())
    }

    fn release_lock(&self) -> DbResult<()> {
        let conn = self.connection()?;
        // The lock is dropped on the next access after the mode is reset.
        conn.execute_batch("PRAGMA locking_mode = NORMAL; SELECT count(*) FROM sqlite_master;")?;
        log::debug!("Released exclusive SQLite lock");
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
#[path = "sqlite_test.rs"]
mod tests;
