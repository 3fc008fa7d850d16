//! `wm pending` - migrations not yet applied, in application order

use anyhow::{Context, Result};
use wm_engine::RunOptions;

use crate::cli::{GlobalArgs, PendingArgs};
use crate::commands::common::print_table;
use crate::context::RuntimeContext;

/// Execute the pending command
pub(crate) fn execute(_args: &PendingArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let runner = ctx.runner(RunOptions::default())?;
    let pending = runner.pending().context("Failed to compute pending migrations")?;

    if pending.is_empty() {
        println!("No pending migrations.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = pending
        .iter()
        .map(|p| vec![p.version.to_string(), p.name.clone()])
        .collect();
    print_table(&["VERSION", "NAME"], &rows);
    Ok(())
}
