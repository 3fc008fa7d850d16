//! `wm migrate` - apply pending migrations

use anyhow::Result;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{parse_version, print_progress};
use crate::context::RuntimeContext;

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let target_version = args.to.as_deref().map(parse_version).transpose()?;

    let ctx = RuntimeContext::new(global)?;
    let runner = ctx
        .runner(ctx.run_options(&args.execution))?
        .with_observer(print_progress);

    let applied = match target_version {
        Some(version) => runner.apply_to(version)?,
        None => runner.apply_all()?,
    };

    if applied.is_empty() {
        println!("Database is up to date.");
    } else {
        println!("\nApplied {} migration(s).", applied.len());
    }
    Ok(())
}
