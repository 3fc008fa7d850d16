//! Waymark CLI - versioned schema migrations

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod context;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{migrate, new, pending, rollback, status, verify};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = run(&cli) {
        if let Some(code) = err.downcast_ref::<ExitCode>() {
            std::process::exit(code.0);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Status(args) => status::execute(args, &cli.global),
        Commands::Pending(args) => pending::execute(args, &cli.global),
        Commands::Migrate(args) => migrate::execute(args, &cli.global),
        Commands::Rollback(args) => rollback::execute(args, &cli.global),
        Commands::Verify(args) => verify::execute(args, &cli.global),
        Commands::New(args) => new::execute(args, &cli.global),
    }
}

/// `info` for Waymark's own crates (`debug` with `--verbose`), `warn` for
/// everything else. `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = format!("warn,wm={level},wm_core={level},wm_db={level},wm_engine={level}");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(verbose)
        .init();
}
