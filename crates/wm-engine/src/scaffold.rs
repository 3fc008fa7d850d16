//! Scaffolding for new SQL migration directories.

use crate::error::{EngineError, EngineResult};
use crate::sql_migration::{parse_dir_name, MigrationMeta, DOWN_FILE, META_FILES, UP_FILE};
use std::path::{Path, PathBuf};
use wm_core::{CoreError, MigrationName, MigrationVersion};

/// Create `<dir>/<version>_<name>/` with stub `up.sql`, `down.sql` and
/// `migration.yml`. Returns the new directory.
///
/// Refuses to reuse a version already present in `dir`.
pub fn scaffold_migration(
    dir: &Path,
    name: &MigrationName,
    description: &str,
    version: MigrationVersion,
) -> EngineResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

    for entry in std::fs::read_dir(dir).map_err(|e| read_error(dir, e))? {
        let entry = entry.map_err(|e| read_error(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if let Ok((existing_version, existing_name)) = parse_dir_name(&file_name) {
            if existing_version == version {
                return Err(EngineError::DuplicateVersion {
                    version,
                    existing: existing_name.into_inner(),
                    duplicate: name.to_string(),
                });
            }
        }
    }

    let target = dir.join(format!("{}_{}", version.to_file_safe(), name));
    std::fs::create_dir(&target).map_err(|e| write_error(&target, e))?;

    let header = if description.is_empty() {
        format!("-- {name}")
    } else {
        format!("-- {name}: {description}")
    };
    write(
        &target.join(UP_FILE),
        &format!("{header}\n-- Forward migration for {version}\n"),
    )?;
    write(
        &target.join(DOWN_FILE),
        &format!("{header}\n-- Undo the forward migration. Delete this file if it cannot be undone.\n"),
    )?;
    let meta = MigrationMeta {
        description: description.to_string(),
    };
    let yaml = serde_yaml::to_string(&meta).map_err(|e| CoreError::ConfigInvalid {
        message: format!("failed to serialize migration metadata: {e}"),
    })?;
    write(&target.join(META_FILES[0]), &yaml)?;

    log::info!("Created migration {}", target.display());
    Ok(target)
}

fn write(path: &Path, content: &str) -> EngineResult<()> {
    std::fs::write(path, content).map_err(|e| write_error(path, e))
}

fn read_error(path: &Path, source: std::io::Error) -> EngineError {
    CoreError::IoWithPath {
        path: path.display().to_string(),
        source,
    }
    .into()
}

fn write_error(path: &Path, source: std::io::Error) -> EngineError {
    CoreError::WriteWithPath {
        path: path.display().to_string(),
        source,
    }
    .into()
}

#[cfg(test)]
#[path = "scaffold_test.rs"]
mod tests;
