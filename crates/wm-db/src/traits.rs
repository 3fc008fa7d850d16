//! Database trait definition

use crate::error::{DbError, DbResult};
use std::sync::Arc;

/// One result row; every cell rendered as text, `None` for SQL NULL.
pub type Row = Vec<Option<String>>;

/// Aborts the statement currently running on a connection, from any thread.
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// Database abstraction trait for Waymark
///
/// The migration engine only needs raw statement execution, simple text
/// queries, transaction control, and an optional connection-scoped lock.
/// Implementations must be Send + Sync.
pub trait Database: Send + Sync {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Execute one statement with positional text parameters, returns affected rows
    fn execute(&self, sql: &str, params: &[&str]) -> DbResult<usize>;

    /// Execute multiple SQL statements
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query with positional text parameters and collect every row
    fn query_rows(&self, sql: &str, params: &[&str]) -> DbResult<Vec<Row>>;

    /// Open a transaction on the connection
    fn begin(&self) -> DbResult<()> {
        self.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()> {
        self.execute_batch("COMMIT").map_err(|e| match e {
            DbError::ConstraintViolation(msg) => DbError::ConstraintViolation(msg),
            other => DbError::TransactionError(format!("COMMIT failed: {other}")),
        })
    }

    /// Roll back the open transaction
    fn rollback(&self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    /// Take a lock that excludes other migration runners for as long as this
    /// connection lives or until [`release_lock`](Self::release_lock).
    ///
    /// The default is a no-op for backends whose connections are already
    /// exclusive.
    fn acquire_lock(&self) -> DbResult<()> {
        Ok(())
    }

    /// Release the lock taken by [`acquire_lock`](Self::acquire_lock)
    fn release_lock(&self) -> DbResult<()> {
        Ok(())
    }

    /// Handle that aborts a long-running statement on this connection.
    ///
    /// Backends without one only observe deadlines between statements.
    fn interrupt_handle(&self) -> Option<Arc<dyn Interrupt>> {
        None
    }
}
