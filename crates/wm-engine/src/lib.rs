//! wm-engine - Migration engine for Waymark
//!
//! Migrations are registered into a [`Registry`], applied in ascending
//! version order by a [`Runner`], and recorded in a [`Ledger`] table inside
//! the migrated database. Each migration's schema change and its ledger row
//! commit in the same transaction.

pub mod error;
pub mod ledger;
pub mod migration;
pub mod registry;
pub mod runner;
pub mod scaffold;
pub mod sql_migration;

pub use error::{EngineError, EngineResult};
pub use ledger::{Ledger, LedgerEntry};
pub use migration::{Direction, Migration, StepError};
pub use registry::Registry;
pub use runner::{
    Inconsistency, MigrationState, MigrationStatus, PendingMigration, RunOptions, Runner,
    StateChange, StatusReport,
};
pub use scaffold::scaffold_migration;
pub use sql_migration::{discover_migrations, load_registry, MigrationMeta, SqlMigration};
