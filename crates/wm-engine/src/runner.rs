//! Migration runner.
//!
//! Computes the pending set (registry minus ledger) and applies it in
//! ascending version order, one transaction per migration. Rollbacks run in
//! the mirror direction, newest first. Every per-migration state transition
//! is logged and reported to an optional observer.

use crate::error::{EngineError, EngineResult};
use crate::ledger::{Ledger, LedgerEntry};
use crate::migration::{Direction, Migration, StepError};
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use wm_core::{InconsistencyPolicy, MigrationVersion};
use wm_db::{Database, DbError, LockGuard, RunContext, Transaction};

/// Per-migration state as seen by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Pending,
    Applying,
    Applied,
    RollingBack,
    Failed,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Pending => "pending",
            MigrationState::Applying => "applying",
            MigrationState::Applied => "applied",
            MigrationState::RollingBack => "rolling back",
            MigrationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A state transition reported to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub version: MigrationVersion,
    pub name: String,
    pub state: MigrationState,
}

/// A registered migration that has not been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMigration {
    pub version: MigrationVersion,
    pub name: String,
}

/// Disagreement between the ledger and the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// Applied, but no longer registered
    OrphanedApplication {
        version: MigrationVersion,
        name: String,
    },
    /// Applied, but the migration changed since
    ChecksumMismatch {
        version: MigrationVersion,
        name: String,
        recorded: String,
        current: String,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::OrphanedApplication { version, name } => {
                write!(f, "{version} ({name}) is applied but not registered")
            }
            Inconsistency::ChecksumMismatch {
                version,
                name,
                recorded,
                current,
            } => write!(
                f,
                "{version} ({name}) changed after it was applied (recorded {recorded}, now {current})"
            ),
        }
    }
}

/// One row of [`StatusReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: MigrationVersion,
    pub name: String,
    pub description: String,
    pub state: MigrationState,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Every registered migration with its state, plus ledger orphans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub migrations: Vec<MigrationStatus>,
    pub orphans: Vec<LedgerEntry>,
}

impl StatusReport {
    pub fn pending_count(&self) -> usize {
        self.migrations
            .iter()
            .filter(|m| m.state == MigrationState::Pending)
            .count()
    }
}

/// Options for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Hold the database's migration lock for each operation
    pub lock: bool,
    /// Deadline and cancellation checked before every statement
    pub context: RunContext,
    /// Compare the ledger with the registry under the lock before migrating
    /// or rolling back; `None` skips the check
    pub consistency: Option<InconsistencyPolicy>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            lock: true,
            context: RunContext::new(),
            consistency: None,
        }
    }
}

type Observer<'a> = Box<dyn Fn(&StateChange) + 'a>;

/// Applies and rolls back the migrations of a [`Registry`] against a database.
pub struct Runner<'a> {
    registry: &'a Registry,
    db: &'a dyn Database,
    ledger: Ledger<'a>,
    options: RunOptions,
    observer: Option<Observer<'a>>,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a Registry, db: &'a dyn Database) -> Self {
        Self {
            registry,
            db,
            ledger: Ledger::new(db),
            options: RunOptions::default(),
            observer: None,
        }
    }

    /// Keep the ledger in `table` instead of the default table.
    pub fn with_ledger_table(mut self, table: &str) -> EngineResult<Self> {
        self.ledger = Ledger::with_table(self.db, table)?;
        Ok(self)
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Report every state transition to `observer`.
    pub fn with_observer(mut self, observer: impl Fn(&StateChange) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn ledger(&self) -> &Ledger<'a> {
        &self.ledger
    }

    /// Registered migrations not yet applied, ascending.
    pub fn pending(&self) -> EngineResult<Vec<PendingMigration>> {
        self.ledger.bootstrap()?;
        let applied = self.ledger.applied_versions()?;
        Ok(self
            .pending_migrations(&applied, None)
            .into_iter()
            .map(|m| PendingMigration {
                version: m.version(),
                name: m.name().to_string(),
            })
            .collect())
    }

    /// Apply every pending migration; returns the versions applied.
    pub fn apply_all(&self) -> EngineResult<Vec<MigrationVersion>> {
        self.apply_pending(None)
    }

    /// Apply pending migrations up to and including `target`.
    pub fn apply_to(&self, target: MigrationVersion) -> EngineResult<Vec<MigrationVersion>> {
        if !self.registry.contains(target) {
            return Err(EngineError::UnknownVersion { version: target });
        }
        self.apply_pending(Some(target))
    }

    /// Roll back a single migration. Later migrations must not be applied.
    pub fn rollback(&self, version: MigrationVersion) -> EngineResult<()> {
        let migration = self
            .registry
            .get(version)
            .ok_or(EngineError::UnknownVersion { version })?;
        ensure_reversible(migration)?;

        let _lock = self.lock()?;
        self.ledger.bootstrap()?;
        self.check_ledger()?;
        let applied = self.ledger.applied_versions()?;
        if !applied.contains(&version) {
            return Err(EngineError::NotApplied { version });
        }
        let dependents: Vec<MigrationVersion> = applied
            .range((Bound::Excluded(version), Bound::Unbounded))
            .copied()
            .collect();
        if !dependents.is_empty() {
            return Err(EngineError::DependentMigrationsApplied {
                version,
                dependents,
            });
        }

        self.step(migration, Direction::Down)
    }

    /// Roll back every applied migration newer than `target`, newest first.
    pub fn rollback_to(&self, target: MigrationVersion) -> EngineResult<Vec<MigrationVersion>> {
        if !self.registry.contains(target) {
            return Err(EngineError::UnknownVersion { version: target });
        }
        self.rollback_after(Some(target))
    }

    /// Roll back every applied migration, newest first.
    pub fn rollback_all(&self) -> EngineResult<Vec<MigrationVersion>> {
        self.rollback_after(None)
    }

    /// Compare the ledger against the registry.
    pub fn verify(&self) -> EngineResult<Vec<Inconsistency>> {
        self.ledger.bootstrap()?;
        let mut found = Vec::new();
        for entry in self.ledger.entries()? {
            match self.registry.get(entry.version) {
                None => found.push(Inconsistency::OrphanedApplication {
                    version: entry.version,
                    name: entry.name,
                }),
                Some(migration) => {
                    let current = migration.checksum();
                    if current != entry.checksum {
                        found.push(Inconsistency::ChecksumMismatch {
                            version: entry.version,
                            name: entry.name,
                            recorded: entry.checksum,
                            current,
                        });
                    }
                }
            }
        }
        Ok(found)
    }

    /// Fail if [`verify`](Self::verify) finds anything. Orphans are reported
    /// before checksum mismatches.
    pub fn ensure_consistent(&self) -> EngineResult<()> {
        let found = self.verify()?;
        let orphans: Vec<MigrationVersion> = found
            .iter()
            .filter_map(|i| match i {
                Inconsistency::OrphanedApplication { version, .. } => Some(*version),
                Inconsistency::ChecksumMismatch { .. } => None,
            })
            .collect();
        if !orphans.is_empty() {
            return Err(EngineError::OrphanedApplication { versions: orphans });
        }
        match found.into_iter().next() {
            Some(Inconsistency::ChecksumMismatch {
                version,
                name,
                recorded,
                current,
            }) => Err(EngineError::ChecksumMismatch {
                version,
                name,
                recorded,
                current,
            }),
            _ => Ok(()),
        }
    }

    /// Every registered migration with its state, plus orphans.
    pub fn status(&self) -> EngineResult<StatusReport> {
        self.ledger.bootstrap()?;
        let entries = self.ledger.entries()?;
        let migrations = self
            .registry
            .sorted()
            .into_iter()
            .map(|m| {
                let applied_at = entries
                    .iter()
                    .find(|e| e.version == m.version())
                    .map(|e| e.applied_at);
                MigrationStatus {
                    version: m.version(),
                    name: m.name().to_string(),
                    description: m.description().to_string(),
                    state: if applied_at.is_some() {
                        MigrationState::Applied
                    } else {
                        MigrationState::Pending
                    },
                    applied_at,
                }
            })
            .collect();
        let orphans = entries
            .into_iter()
            .filter(|e| !self.registry.contains(e.version))
            .collect();
        Ok(StatusReport {
            migrations,
            orphans,
        })
    }

    fn apply_pending(
        &self,
        limit: Option<MigrationVersion>,
    ) -> EngineResult<Vec<MigrationVersion>> {
        let _lock = self.lock()?;
        self.ledger.bootstrap()?;
        self.check_ledger()?;
        let applied = self.ledger.applied_versions()?;
        let pending = self.pending_migrations(&applied, limit);
        if pending.is_empty() {
            log::info!("No pending migrations");
            return Ok(Vec::new());
        }

        let mut done = Vec::with_capacity(pending.len());
        for migration in pending {
            self.step(migration, Direction::Up)?;
            done.push(migration.version());
        }
        Ok(done)
    }

    fn rollback_after(
        &self,
        target: Option<MigrationVersion>,
    ) -> EngineResult<Vec<MigrationVersion>> {
        let _lock = self.lock()?;
        self.ledger.bootstrap()?;
        self.check_ledger()?;
        let applied = self.ledger.applied_versions()?;
        let lower = target.map_or(Bound::Unbounded, Bound::Excluded);
        let to_revert: Vec<MigrationVersion> = applied
            .range((lower, Bound::Unbounded))
            .rev()
            .copied()
            .collect();

        let unregistered: Vec<MigrationVersion> = to_revert
            .iter()
            .copied()
            .filter(|v| !self.registry.contains(*v))
            .collect();
        if !unregistered.is_empty() {
            return Err(EngineError::OrphanedApplication {
                versions: unregistered,
            });
        }
        let migrations: Vec<&dyn Migration> = to_revert
            .iter()
            .filter_map(|v| self.registry.get(*v))
            .collect();
        for migration in &migrations {
            ensure_reversible(*migration)?;
        }

        if migrations.is_empty() {
            log::info!("Nothing to roll back");
        }
        for migration in migrations {
            self.step(migration, Direction::Down)?;
        }
        Ok(to_revert)
    }

    fn pending_migrations(
        &self,
        applied: &BTreeSet<MigrationVersion>,
        limit: Option<MigrationVersion>,
    ) -> Vec<&'a dyn Migration> {
        self.registry
            .sorted()
            .into_iter()
            .filter(|m| !applied.contains(&m.version()))
            .filter(|m| limit.map_or(true, |target| m.version() <= target))
            .collect()
    }

    fn check_ledger(&self) -> EngineResult<()> {
        match self.options.consistency {
            None => Ok(()),
            Some(InconsistencyPolicy::Fail) => self.ensure_consistent(),
            Some(InconsistencyPolicy::Warn) => {
                for inconsistency in self.verify()? {
                    log::warn!("Ledger inconsistency: {inconsistency}");
                }
                Ok(())
            }
        }
    }

    fn lock(&self) -> EngineResult<Option<LockGuard<'a>>> {
        if !self.options.lock {
            return Ok(None);
        }
        match LockGuard::acquire(self.db) {
            Ok(guard) => Ok(Some(guard)),
            Err(DbError::LockUnavailable(msg)) => Err(EngineError::LockUnavailable(msg)),
            Err(e) => Err(e.into()),
        }
    }

    /// Run one migration in one direction, reporting its transitions.
    fn step(&self, migration: &dyn Migration, direction: Direction) -> EngineResult<()> {
        let (running, done) = match direction {
            Direction::Up => (MigrationState::Applying, MigrationState::Applied),
            Direction::Down => (MigrationState::RollingBack, MigrationState::Pending),
        };
        let verb = match direction {
            Direction::Up => "Applying",
            Direction::Down => "Rolling back",
        };
        self.notify(migration, running);
        log::info!(
            "{verb} migration {} ({})",
            migration.version(),
            migration.name()
        );

        match self.run_in_transaction(migration, direction) {
            Ok(()) => {
                self.notify(migration, done);
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "Migration {} ({}) failed: {e}",
                    migration.version(),
                    migration.name()
                );
                self.notify(migration, MigrationState::Failed);
                Err(e)
            }
        }
    }

    fn run_in_transaction(
        &self,
        migration: &dyn Migration,
        direction: Direction,
    ) -> EngineResult<()> {
        let version = migration.version();
        let tx = Transaction::begin(self.db, &self.options.context)
            .map_err(|e| failed(migration, direction, e.into()))?;

        let body = match direction {
            Direction::Up => migration.up(&tx),
            Direction::Down => migration.down(&tx),
        };
        if let Err(cause) = body {
            if let Err(e) = tx.rollback() {
                log::warn!("Rollback after failed migration {version} also failed: {e}");
            }
            if direction == Direction::Down && matches!(cause, StepError::Unsupported) {
                return Err(EngineError::IrreversibleMigration {
                    version,
                    name: migration.name().to_string(),
                });
            }
            return Err(failed(migration, direction, cause));
        }

        let ledger_write = match direction {
            Direction::Up => self.ledger.record_applied(
                &tx,
                &LedgerEntry {
                    version,
                    name: migration.name().to_string(),
                    checksum: migration.checksum(),
                    applied_at: Utc::now(),
                },
            ),
            Direction::Down => self.ledger.remove_applied(&tx, version),
        };
        ledger_write.map_err(|e| match e {
            EngineError::Database(db) => failed(migration, direction, db.into()),
            other => other,
        })?;

        tx.commit().map_err(|e| match (direction, e) {
            (Direction::Up, DbError::ConstraintViolation(_)) => {
                EngineError::DuplicateApplication { version }
            }
            (_, e) => failed(migration, direction, e.into()),
        })
    }

    fn notify(&self, migration: &dyn Migration, state: MigrationState) {
        log::debug!("{} ({}) -> {state}", migration.version(), migration.name());
        if let Some(observer) = &self.observer {
            observer(&StateChange {
                version: migration.version(),
                name: migration.name().to_string(),
                state,
            });
        }
    }
}

fn ensure_reversible(migration: &dyn Migration) -> EngineResult<()> {
    if migration.reversible() {
        Ok(())
    } else {
        Err(EngineError::IrreversibleMigration {
            version: migration.version(),
            name: migration.name().to_string(),
        })
    }
}

fn failed(migration: &dyn Migration, direction: Direction, cause: StepError) -> EngineError {
    EngineError::MigrationFailed {
        version: migration.version(),
        name: migration.name().to_string(),
        direction,
        cause,
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
