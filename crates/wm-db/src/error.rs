//! Error types for wm-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Unique/primary-key/check constraint violated (D003)
    #[error("[D003] Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Another connection holds the lock (D004)
    #[error("[D004] Database is locked by another connection: {0}")]
    LockUnavailable(String),

    /// The run's deadline passed before the statement could execute (D005)
    #[error("[D005] Deadline exceeded after {elapsed_ms} ms")]
    DeadlineExceeded { elapsed_ms: u128 },

    /// The run was cancelled by the caller (D006)
    #[error("[D006] Operation cancelled")]
    Cancelled,

    /// BEGIN/COMMIT/ROLLBACK failed (D007)
    #[error("[D007] Transaction failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D008)
    #[error("[D008] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants for constraint
        // failures, so the message is the only thing to classify on.
        let msg = err.to_string();
        if msg.contains("Constraint Error")
            || msg.contains("Duplicate key")
            || msg.contains("violates primary key constraint")
            || msg.contains("constraint violated")
        {
            DbError::ConstraintViolation(msg)
        } else if msg.contains("Could not set lock on file") || msg.contains("Conflicting lock") {
            DbError::LockUnavailable(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                rusqlite::ErrorCode::ConstraintViolation => {
                    DbError::ConstraintViolation(err.to_string())
                }
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    DbError::LockUnavailable(err.to_string())
                }
                _ => DbError::ExecutionError(err.to_string()),
            },
            _ => DbError::ExecutionError(err.to_string()),
        }
    }
}
