//! Error types for wm-engine

use crate::migration::{Direction, StepError};
use std::path::PathBuf;
use thiserror::Error;
use wm_core::{CoreError, MigrationVersion};
use wm_db::DbError;

/// Migration engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// W001: Two registered migrations share a version
    #[error("[W001] Duplicate migration version {version}: '{existing}' and '{duplicate}'")]
    DuplicateVersion {
        version: MigrationVersion,
        existing: String,
        duplicate: String,
    },

    /// W002: The ledger already records this version
    #[error("[W002] Migration {version} is already recorded as applied")]
    DuplicateApplication { version: MigrationVersion },

    /// W003: A migration's up or down procedure failed; its transaction was rolled back
    #[error("[W003] Migration {version} ({name}) failed while migrating {direction}")]
    MigrationFailed {
        version: MigrationVersion,
        name: String,
        direction: Direction,
        #[source]
        cause: StepError,
    },

    /// W004: Rollback of a version that is not applied
    #[error("[W004] Migration {version} is not applied")]
    NotApplied { version: MigrationVersion },

    /// W005: Rollback of a version while later versions are still applied
    #[error(
        "[W005] Cannot roll back {version}: later migrations are still applied ({})",
        join_versions(.dependents)
    )]
    DependentMigrationsApplied {
        version: MigrationVersion,
        dependents: Vec<MigrationVersion>,
    },

    /// W006: Rollback of a migration without a down procedure
    #[error("[W006] Migration {version} ({name}) is irreversible")]
    IrreversibleMigration {
        version: MigrationVersion,
        name: String,
    },

    /// W007: The ledger records versions that are not registered
    #[error("[W007] Applied migrations are not registered: {}", join_versions(.versions))]
    OrphanedApplication { versions: Vec<MigrationVersion> },

    /// W008: An applied migration changed after it was applied
    #[error("[W008] Migration {version} ({name}) changed after it was applied: recorded checksum {recorded}, current {current}")]
    ChecksumMismatch {
        version: MigrationVersion,
        name: String,
        recorded: String,
        current: String,
    },

    /// W009: A version argument names no registered migration
    #[error("[W009] No registered migration has version {version}")]
    UnknownVersion { version: MigrationVersion },

    /// W010: Another runner holds the migration lock
    #[error("[W010] Another migration run holds the lock: {0}")]
    LockUnavailable(String),

    /// W011: A migration directory is malformed
    #[error("[W011] Invalid migration directory {}: {reason}", .path.display())]
    InvalidMigrationDirectory { path: PathBuf, reason: String },

    /// W012: A ledger row could not be read back
    #[error("[W012] Ledger table {table} is corrupt: {message}")]
    LedgerCorrupt { table: String, message: String },

    /// Database error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Core error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

fn join_versions(versions: &[MigrationVersion]) -> String {
    versions
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(day: u32) -> MigrationVersion {
        MigrationVersion::from_ymd_hms(2021, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_dependents_are_listed() {
        let err = EngineError::DependentMigrationsApplied {
            version: v(1),
            dependents: vec![v(2), v(3)],
        };
        assert_eq!(
            err.to_string(),
            "[W005] Cannot roll back 2021-01-01T00:00:00Z: later migrations are still applied \
             (2021-01-02T00:00:00Z, 2021-01-03T00:00:00Z)"
        );
    }

    #[test]
    fn test_migration_failed_keeps_cause() {
        let err = EngineError::MigrationFailed {
            version: v(2),
            name: "add_users".to_string(),
            direction: Direction::Up,
            cause: StepError::Message("boom".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "[W003] Migration 2021-01-02T00:00:00Z (add_users) failed while migrating up"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "boom");
    }
}
