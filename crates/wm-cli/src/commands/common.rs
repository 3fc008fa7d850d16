//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use wm_core::MigrationVersion;
use wm_engine::{MigrationState, StateChange};

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run (the migration lock is released by one).
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; never shown to the user.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Parse a version argument in any accepted form.
pub(crate) fn parse_version(value: &str) -> Result<MigrationVersion> {
    MigrationVersion::parse(value).with_context(|| format!("Invalid version '{value}'"))
}

/// Observer that prints each finished migration step.
pub(crate) fn print_progress(change: &StateChange) {
    let (mark, label) = match change.state {
        MigrationState::Applied => ("\u{2714}", "applied"),
        MigrationState::Pending => ("\u{21a9}", "rolled back"),
        MigrationState::Failed => ("\u{2718}", "failed"),
        MigrationState::Applying | MigrationState::RollingBack => return,
    };
    println!("  {mark} {label:<12} {}  {}", change.version, change.name);
}

/// Calculate column widths for table output
fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    widths
}

/// Print a simple aligned table to stdout
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}
