//! `wm new` - scaffold a migration directory

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use wm_core::{MigrationName, MigrationVersion};
use wm_engine::scaffold_migration;

use crate::cli::{GlobalArgs, NewArgs};
use crate::context::load_config;

/// Execute the new command
pub(crate) fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let name = MigrationName::new(args.name.as_str()).context("Invalid migration name")?;
    let description = args.description.join(" ");

    let dir = match &args.dir {
        Some(dir) => PathBuf::from(dir),
        None => {
            let (config, root) = load_config(global)?;
            match config.migration_paths_absolute(&root).into_iter().next() {
                Some(path) => path,
                None => bail!("No migration_paths configured"),
            }
        }
    };

    let created = scaffold_migration(&dir, &name, &description, MigrationVersion::now())
        .context("Failed to create migration")?;
    println!("Created {}", created.display());
    Ok(())
}
