//! `wm status` - every migration with its applied marker

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use wm_engine::{MigrationState, RunOptions, StatusReport};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::print_table;
use crate::context::RuntimeContext;

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let runner = ctx.runner(RunOptions::default())?;
    let report = runner.status().context("Failed to read migration status")?;

    match args.output {
        StatusOutput::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize status report")?;
            println!("{json}");
        }
        StatusOutput::Table => print_report(&ctx, &report),
    }
    Ok(())
}

fn print_report(ctx: &RuntimeContext, report: &StatusReport) {
    if let Some(target) = &ctx.target {
        println!("Target: {target}\n");
    }
    if report.migrations.is_empty() {
        println!("No migrations found.");
    } else {
        let rows: Vec<Vec<String>> = report
            .migrations
            .iter()
            .map(|m| {
                let marker = if m.state == MigrationState::Applied {
                    "\u{2714}"
                } else {
                    ""
                };
                vec![
                    marker.to_string(),
                    m.version.to_string(),
                    m.name.clone(),
                    m.applied_at
                        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
                        .unwrap_or_else(|| "-".to_string()),
                    m.description.clone(),
                ]
            })
            .collect();
        print_table(&["", "VERSION", "NAME", "APPLIED AT", "DESCRIPTION"], &rows);
    }

    if !report.orphans.is_empty() {
        println!("\nApplied but not found on disk:");
        let rows: Vec<Vec<String>> = report
            .orphans
            .iter()
            .map(|e| {
                vec![
                    e.version.to_string(),
                    e.name.clone(),
                    e.applied_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                ]
            })
            .collect();
        print_table(&["VERSION", "NAME", "APPLIED AT"], &rows);
    }

    let pending = report.pending_count();
    println!(
        "\n{} applied, {} pending",
        report.migrations.len() - pending,
        pending
    );
}
