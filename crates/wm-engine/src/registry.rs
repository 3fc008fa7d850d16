//! In-memory set of known migrations, keyed by version.

use crate::error::{EngineError, EngineResult};
use crate::migration::Migration;
use std::collections::BTreeMap;
use wm_core::{MigrationName, MigrationVersion};

/// Every migration known to this process.
///
/// Built once at startup and then only borrowed by a [`Runner`](crate::Runner).
#[derive(Default)]
pub struct Registry {
    migrations: BTreeMap<MigrationVersion, Box<dyn Migration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an explicit list, failing on the first duplicate.
    pub fn from_migrations<I>(migrations: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = Box<dyn Migration>>,
    {
        let mut registry = Self::new();
        for migration in migrations {
            registry.register(migration)?;
        }
        Ok(registry)
    }

    /// Add a migration.
    ///
    /// Fails with [`EngineError::DuplicateVersion`] if its version is taken,
    /// or with an invalid-name error if its name is not a valid
    /// [`MigrationName`].
    pub fn register(&mut self, migration: Box<dyn Migration>) -> EngineResult<()> {
        MigrationName::new(migration.name())?;
        let version = migration.version();
        if let Some(existing) = self.migrations.get(&version) {
            return Err(EngineError::DuplicateVersion {
                version,
                existing: existing.name().to_string(),
                duplicate: migration.name().to_string(),
            });
        }
        log::debug!("Registered migration {} ({})", version, migration.name());
        self.migrations.insert(version, migration);
        Ok(())
    }

    /// All registered migrations (in no guaranteed order).
    pub fn all(&self) -> impl Iterator<Item = &dyn Migration> + '_ {
        self.migrations.values().map(|m| m.as_ref())
    }

    /// All registered migrations in ascending version order.
    pub fn sorted(&self) -> Vec<&dyn Migration> {
        self.migrations.values().map(|m| m.as_ref()).collect()
    }

    pub fn get(&self, version: MigrationVersion) -> Option<&dyn Migration> {
        self.migrations.get(&version).map(|m| m.as_ref())
    }

    pub fn contains(&self, version: MigrationVersion) -> bool {
        self.migrations.contains_key(&version)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// The highest registered version's migration.
    pub fn latest(&self) -> Option<&dyn Migration> {
        self.migrations.values().next_back().map(|m| m.as_ref())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.migrations
                    .iter()
                    .map(|(version, m)| format!("{version} {}", m.name())),
            )
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
