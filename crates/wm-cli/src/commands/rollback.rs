//! `wm rollback` - undo applied migrations, newest first

use anyhow::Result;

use crate::cli::{GlobalArgs, RollbackArgs};
use crate::commands::common::{parse_version, print_progress};
use crate::context::RuntimeContext;

/// Execute the rollback command
pub(crate) fn execute(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let single = args.version.as_deref().map(parse_version).transpose()?;
    let down_to = args.to.as_deref().map(parse_version).transpose()?;

    let ctx = RuntimeContext::new(global)?;
    let runner = ctx
        .runner(ctx.run_options(&args.execution))?
        .with_observer(print_progress);

    let reverted = match (single, down_to) {
        (Some(version), _) => {
            runner.rollback(version)?;
            vec![version]
        }
        (None, Some(target)) => runner.rollback_to(target)?,
        (None, None) => runner.rollback_all()?,
    };

    if reverted.is_empty() {
        println!("Nothing to roll back.");
    } else {
        println!("\nRolled back {} migration(s).", reverted.len());
    }
    Ok(())
}
