//! CLI argument definitions using clap derive API

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

/// Waymark - versioned schema migrations for DuckDB and SQLite
#[derive(Parser, Debug)]
#[command(name = "wm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Named target from waymark.yml (falls back to WM_TARGET)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every migration and whether it is applied
    Status(StatusArgs),

    /// List migrations that have not been applied
    Pending(PendingArgs),

    /// Apply pending migrations
    Migrate(MigrateArgs),

    /// Roll back applied migrations
    Rollback(RollbackArgs),

    /// Check the ledger against the migrations on disk
    Verify(VerifyArgs),

    /// Create a new migration directory
    New(NewArgs),
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Arguments for the pending command
#[derive(Args, Debug)]
pub struct PendingArgs {}

/// Options shared by commands that change the database
#[derive(Args, Debug, Clone)]
pub struct ExecutionArgs {
    /// Abort the run after this many seconds (overrides timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not take the migration lock
    #[arg(long)]
    pub no_lock: bool,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Stop after applying this version
    #[arg(long, value_name = "VERSION")]
    pub to: Option<String>,

    #[command(flatten)]
    pub execution: ExecutionArgs,
}

/// Arguments for the rollback command
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .args(["version", "to", "all"])
))]
pub struct RollbackArgs {
    /// Roll back exactly this version (it must be the newest applied)
    pub version: Option<String>,

    /// Roll back every applied version newer than this one
    #[arg(long, value_name = "VERSION")]
    pub to: Option<String>,

    /// Roll back every applied migration
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub execution: ExecutionArgs,
}

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Migration name (letters, digits, '_' and '-')
    pub name: String,

    /// Description written to migration.yml
    pub description: Vec<String>,

    /// Directory to create the migration in (default: first migration path)
    #[arg(long)]
    pub dir: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
