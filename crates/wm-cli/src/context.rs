//! Runtime context for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wm_core::Config;
use wm_db::{open_database, Database, RunContext};
use wm_engine::{load_registry, Registry, RunOptions, Runner};

use crate::cli::{ExecutionArgs, GlobalArgs};

/// Load the project configuration named by the global arguments.
///
/// Returns the config and the project root that relative paths resolve
/// against.
pub(crate) fn load_config(args: &GlobalArgs) -> Result<(Config, PathBuf)> {
    let root = PathBuf::from(&args.project_dir);
    let config = if let Some(config_path) = &args.config {
        Config::load(Path::new(config_path)).context("Failed to load configuration file")?
    } else {
        Config::load_from_dir(&root).context("Failed to load project configuration")?
    };
    Ok((config, root))
}

/// Runtime context containing the loaded project, its migrations, and the
/// database connection
pub(crate) struct RuntimeContext {
    pub config: Config,

    /// Resolved target name, if any
    pub target: Option<String>,

    pub registry: Registry,

    pub db: Box<dyn Database>,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let (config, root) = load_config(args)?;
        let target = Config::resolve_target(args.target.as_deref());

        let db_config = config
            .get_database_config(target.as_deref())
            .context("Failed to resolve database target")?
            .with_root(&root);
        let db = open_database(&db_config).with_context(|| {
            format!(
                "Failed to open {} database at {}",
                db_config.db_type, db_config.path
            )
        })?;

        let registry = load_registry(&config.migration_paths_absolute(&root))
            .context("Failed to load migrations")?;
        log::debug!(
            "Loaded {} migrations for project '{}' (target: {})",
            registry.len(),
            config.name,
            target.as_deref().unwrap_or("default")
        );

        Ok(Self {
            config,
            target,
            registry,
            db,
        })
    }

    /// Runner over the project's migrations and ledger table
    pub fn runner(&self, options: RunOptions) -> Result<Runner<'_>> {
        let runner = Runner::new(&self.registry, self.db.as_ref())
            .with_ledger_table(&self.config.ledger_table)?
            .with_options(options);
        Ok(runner)
    }

    /// Run options from config, overridden by command-line flags.
    ///
    /// The runner applies the project's inconsistency policy while holding
    /// the migration lock.
    pub fn run_options(&self, args: &ExecutionArgs) -> RunOptions {
        let context = match args.timeout.or(self.config.timeout_secs) {
            Some(secs) => RunContext::with_timeout(Duration::from_secs(secs)),
            None => RunContext::new(),
        };
        RunOptions {
            lock: self.config.lock && !args.no_lock,
            context,
            consistency: Some(self.config.on_inconsistency),
        }
    }
}
