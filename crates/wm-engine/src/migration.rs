//! The migration contract.

use std::fmt;
use thiserror::Error;
use wm_core::{compute_checksum, MigrationVersion};
use wm_db::{DbError, Transaction};

/// Failure returned by a migration's up or down procedure.
#[derive(Error, Debug)]
pub enum StepError {
    /// A statement failed (including deadline and cancellation)
    #[error(transparent)]
    Database(#[from] DbError),

    /// The migration refused to run
    #[error("{0}")]
    Message(String),

    /// The migration has no down procedure
    #[error("migration has no down procedure")]
    Unsupported,
}

/// Which procedure of a migration is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A single, immutable schema change.
///
/// Implementations issue statements only through the given [`Transaction`];
/// the runner owns it and commits or rolls back. Migrations are irreversible
/// unless they implement [`down`](Self::down) and return `true` from
/// [`reversible`](Self::reversible); rollback refuses an irreversible
/// migration before opening a transaction.
///
/// ```rust,ignore
/// struct CreateUsers;
///
/// impl Migration for CreateUsers {
///     fn version(&self) -> MigrationVersion {
///         "2021-03-10T05:16:21Z".parse().unwrap()
///     }
///     fn name(&self) -> &str {
///         "create_users"
///     }
///     fn up(&self, tx: &Transaction<'_>) -> Result<(), StepError> {
///         tx.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY)")?;
///         Ok(())
///     }
///     fn down(&self, tx: &Transaction<'_>) -> Result<(), StepError> {
///         tx.execute_batch("DROP TABLE users")?;
///         Ok(())
///     }
///     fn reversible(&self) -> bool {
///         true
///     }
/// }
/// ```
pub trait Migration: Send + Sync {
    /// Globally unique version; ordering key for application.
    fn version(&self) -> MigrationVersion;

    /// Short identifier (letters, digits, `_`, `-`).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Forward procedure.
    fn up(&self, tx: &Transaction<'_>) -> Result<(), StepError>;

    /// Backward procedure. Only called when [`reversible`](Self::reversible)
    /// returns `true`.
    fn down(&self, _tx: &Transaction<'_>) -> Result<(), StepError> {
        Err(StepError::Unsupported)
    }

    /// Whether [`down`](Self::down) undoes [`up`](Self::up). Override
    /// together with `down`.
    fn reversible(&self) -> bool {
        false
    }

    /// Recorded in the ledger when applied and compared by verify.
    ///
    /// The default covers the version and name only; override it to include
    /// the migration's content.
    fn checksum(&self) -> String {
        compute_checksum(&format!("{}:{}", self.version(), self.name()))
    }
}
