//! wm-core - Core library for Waymark
//!
//! This crate provides the shared types used across all Waymark components:
//! migration versions and names, project configuration parsing, and the
//! checksum used to detect edits to applied migrations.

pub mod checksum;
pub mod config;
pub mod error;
pub mod migration_name;
pub(crate) mod serde_helpers;
pub mod version;

pub use checksum::compute_checksum;
pub use config::{
    is_valid_table_name, Config, DatabaseConfig, DbType, InconsistencyPolicy, TargetConfig,
};
pub use error::{CoreError, CoreResult};
pub use migration_name::MigrationName;
pub use version::MigrationVersion;
