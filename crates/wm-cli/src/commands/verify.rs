//! `wm verify` - compare the ledger with the migrations on disk

use anyhow::{Context, Result};
use wm_engine::RunOptions;

use crate::cli::{GlobalArgs, VerifyArgs};
use crate::commands::common::ExitCode;
use crate::context::RuntimeContext;

/// Execute the verify command
pub(crate) fn execute(_args: &VerifyArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let runner = ctx.runner(RunOptions::default())?;
    let found = runner.verify().context("Failed to verify the ledger")?;

    if found.is_empty() {
        println!(
            "\u{2714} Ledger is consistent with {} migration(s).",
            ctx.registry.len()
        );
        return Ok(());
    }

    eprintln!("Ledger has {} problem(s):", found.len());
    for inconsistency in &found {
        eprintln!("  \u{2718} {inconsistency}");
    }
    Err(ExitCode(1).into())
}
