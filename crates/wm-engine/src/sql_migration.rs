//! Migrations defined as SQL files on disk.
//!
//! Each migration lives in its own directory named
//! `<file-safe version>_<name>`, e.g. `2021-03-10T051621Z_create_users/`:
//!
//! ```text
//! up.sql          required, forward procedure
//! down.sql        optional; without it the migration is irreversible
//! migration.yml   optional metadata (description)
//! ```

use crate::error::{EngineError, EngineResult};
use crate::migration::{Migration, StepError};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wm_core::{compute_checksum, CoreError, MigrationName, MigrationVersion};
use wm_db::Transaction;

pub(crate) const UP_FILE: &str = "up.sql";
pub(crate) const DOWN_FILE: &str = "down.sql";
pub(crate) const META_FILES: [&str; 2] = ["migration.yml", "migration.yaml"];

/// Contents of `migration.yml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationMeta {
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

/// A migration whose procedures are SQL scripts.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    version: MigrationVersion,
    name: MigrationName,
    description: String,
    up_sql: String,
    down_sql: Option<String>,
    path: Option<PathBuf>,
}

impl SqlMigration {
    /// An irreversible migration running `up_sql`.
    pub fn new(version: MigrationVersion, name: MigrationName, up_sql: impl Into<String>) -> Self {
        Self {
            version,
            name,
            description: String::new(),
            up_sql: up_sql.into(),
            down_sql: None,
            path: None,
        }
    }

    pub fn with_down(mut self, down_sql: impl Into<String>) -> Self {
        self.down_sql = Some(down_sql.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Load a migration directory.
    pub fn load(dir: &Path) -> EngineResult<Self> {
        let dir_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid(dir, "directory name is not valid UTF-8"))?;
        let (version, name) = parse_dir_name(dir_name).map_err(|e| invalid(dir, e.to_string()))?;

        let mut up_sql = None;
        let mut down_sql = None;
        let mut meta_path: Option<PathBuf> = None;
        for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
            let entry = entry.map_err(|e| io_error(dir, e))?;
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }
            if !path.is_file() {
                return Err(invalid(dir, format!("unexpected directory '{file_name}'")));
            }
            match file_name.as_str() {
                UP_FILE => up_sql = Some(read_file(&path)?),
                DOWN_FILE => down_sql = Some(read_file(&path)?),
                f if META_FILES.contains(&f) => {
                    if meta_path.is_some() {
                        return Err(invalid(
                            dir,
                            "both migration.yml and migration.yaml are present",
                        ));
                    }
                    meta_path = Some(path);
                }
                other => {
                    return Err(invalid(
                        dir,
                        format!(
                            "unexpected file '{other}' (expected {UP_FILE}, {DOWN_FILE}, or migration.yml)"
                        ),
                    ))
                }
            }
        }

        let up_sql = up_sql.ok_or_else(|| invalid(dir, format!("missing {UP_FILE}")))?;
        let meta = match meta_path {
            Some(path) => serde_yaml::from_str::<MigrationMeta>(&read_file(&path)?)
                .map_err(|e| invalid(dir, format!("{}: {e}", path.display())))?,
            None => MigrationMeta::default(),
        };

        Ok(Self {
            version,
            name,
            description: meta.description,
            up_sql,
            down_sql,
            path: Some(dir.to_path_buf()),
        })
    }

    pub fn up_sql(&self) -> &str {
        &self.up_sql
    }

    pub fn down_sql(&self) -> Option<&str> {
        self.down_sql.as_deref()
    }

    /// Directory the migration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Migration for SqlMigration {
    fn version(&self) -> MigrationVersion {
        self.version
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn up(&self, tx: &Transaction<'_>) -> Result<(), StepError> {
        run_script(tx, &self.up_sql)
    }

    fn down(&self, tx: &Transaction<'_>) -> Result<(), StepError> {
        match &self.down_sql {
            Some(sql) => run_script(tx, sql),
            None => Err(StepError::Unsupported),
        }
    }

    fn reversible(&self) -> bool {
        self.down_sql.is_some()
    }

    fn checksum(&self) -> String {
        let down = self.down_sql.as_deref().unwrap_or_default();
        compute_checksum(&format!("{}\0{}", self.up_sql, down))
    }
}

/// Load every migration directory under `paths`.
///
/// Missing paths are skipped with a warning; plain files directly under a
/// path (READMEs and the like) are ignored.
pub fn discover_migrations(paths: &[PathBuf]) -> EngineResult<Vec<SqlMigration>> {
    let mut migrations = Vec::new();
    for root in paths {
        if !root.exists() {
            log::warn!("Migration path {} does not exist, skipping", root.display());
            continue;
        }
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(root).map_err(|e| io_error(root, e))? {
            let entry = entry.map_err(|e| io_error(root, e))?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if path.is_dir() && !hidden {
                dirs.push(path);
            } else {
                log::debug!("Ignoring {} in migration path", path.display());
            }
        }
        dirs.sort();
        for dir in dirs {
            migrations.push(SqlMigration::load(&dir)?);
        }
    }
    log::debug!("Discovered {} SQL migrations", migrations.len());
    Ok(migrations)
}

/// Discover SQL migrations under `paths` into a new [`Registry`].
pub fn load_registry(paths: &[PathBuf]) -> EngineResult<Registry> {
    Registry::from_migrations(
        discover_migrations(paths)?
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn Migration>),
    )
}

/// Split `<file-safe version>_<name>`.
pub(crate) fn parse_dir_name(
    dir_name: &str,
) -> Result<(MigrationVersion, MigrationName), CoreError> {
    let (version, name) = dir_name
        .split_once('_')
        .ok_or_else(|| CoreError::InvalidName {
            name: dir_name.to_string(),
            reason: "expected <version>_<name>, e.g. 2021-03-10T051621Z_create_users".to_string(),
        })?;
    Ok((
        MigrationVersion::parse_file_safe(version)?,
        MigrationName::new(name)?,
    ))
}

fn run_script(tx: &Transaction<'_>, sql: &str) -> Result<(), StepError> {
    if !has_statements(sql) {
        log::debug!("Skipping empty migration script");
        return Ok(());
    }
    tx.execute_batch(sql)?;
    Ok(())
}

/// True unless `sql` is only whitespace and `--` comments.
fn has_statements(sql: &str) -> bool {
    sql.lines()
        .map(|line| line.split("--").next().unwrap_or_default().trim())
        .any(|code| !code.is_empty())
}

fn read_file(path: &Path) -> EngineResult<String> {
    std::fs::read_to_string(path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    CoreError::IoWithPath {
        path: path.display().to_string(),
        source,
    }
    .into()
}

fn invalid(path: &Path, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidMigrationDirectory {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

#[cfg(test)]
#[path = "sql_migration_test.rs"]
mod tests;
