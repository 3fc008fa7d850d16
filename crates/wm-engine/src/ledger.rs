//! Applied-version ledger stored in the migrated database.
//!
//! One row per applied migration. Rows are written and deleted only inside
//! the transaction of the migration they describe.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use wm_core::config::DEFAULT_LEDGER_TABLE;
use wm_core::{is_valid_table_name, CoreError, MigrationVersion};
use wm_db::{Database, DbError, Row, Transaction};

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub version: MigrationVersion,
    pub name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

/// Handle on the ledger table.
pub struct Ledger<'a> {
    db: &'a dyn Database,
    table: String,
}

impl<'a> Ledger<'a> {
    /// Ledger in the default `_waymark_migrations` table.
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }

    /// Ledger in a custom, optionally schema-qualified, table.
    pub fn with_table(db: &'a dyn Database, table: &str) -> EngineResult<Self> {
        if !is_valid_table_name(table) {
            return Err(CoreError::ConfigInvalid {
                message: format!("'{table}' is not a valid ledger table name"),
            }
            .into());
        }
        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table (and its schema) if absent.
    pub fn bootstrap(&self) -> EngineResult<()> {
        if let Some((schema, _)) = self.table.split_once('.') {
            // SQLite schema names are attached databases and cannot be created.
            if self.db.db_type() == "sqlite" {
                log::debug!("Using attached SQLite database '{schema}' for the ledger");
            } else {
                self.db
                    .execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))?;
            }
        }
        self.db.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version    VARCHAR PRIMARY KEY,
                name       VARCHAR NOT NULL,
                checksum   VARCHAR NOT NULL,
                applied_at VARCHAR NOT NULL
            )",
            self.table
        ))?;
        Ok(())
    }

    /// Record `entry` inside `tx`.
    pub fn record_applied(&self, tx: &Transaction<'_>, entry: &LedgerEntry) -> EngineResult<()> {
        let version = entry.version.to_string();
        let existing = tx.query_rows(
            &format!("SELECT version FROM {} WHERE version = ?", self.table),
            &[version.as_str()],
        )?;
        if !existing.is_empty() {
            return Err(EngineError::DuplicateApplication {
                version: entry.version,
            });
        }

        let applied_at = entry.applied_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        tx.execute(
            &format!(
                "INSERT INTO {} (version, name, checksum, applied_at) VALUES (?, ?, ?, ?)",
                self.table
            ),
            &[
                version.as_str(),
                entry.name.as_str(),
                entry.checksum.as_str(),
                applied_at.as_str(),
            ],
        )
        .map_err(|e| match e {
            DbError::ConstraintViolation(_) => EngineError::DuplicateApplication {
                version: entry.version,
            },
            other => other.into(),
        })?;
        Ok(())
    }

    /// Delete the row for `version` inside `tx`.
    pub fn remove_applied(
        &self,
        tx: &Transaction<'_>,
        version: MigrationVersion,
    ) -> EngineResult<()> {
        let removed = tx.execute(
            &format!("DELETE FROM {} WHERE version = ?", self.table),
            &[version.to_string().as_str()],
        )?;
        if removed == 0 {
            return Err(EngineError::NotApplied { version });
        }
        Ok(())
    }

    pub fn is_applied(&self, version: MigrationVersion) -> EngineResult<bool> {
        let rows = self.db.query_rows(
            &format!("SELECT version FROM {} WHERE version = ?", self.table),
            &[version.to_string().as_str()],
        )?;
        Ok(!rows.is_empty())
    }

    /// Every applied version, ascending.
    pub fn applied_versions(&self) -> EngineResult<BTreeSet<MigrationVersion>> {
        let rows = self
            .db
            .query_rows(&format!("SELECT version FROM {}", self.table), &[])?;
        rows.iter()
            .map(|row| self.parse_version(row.first().cloned().flatten()))
            .collect()
    }

    /// Every ledger row, ascending by version.
    pub fn entries(&self) -> EngineResult<Vec<LedgerEntry>> {
        let rows = self.db.query_rows(
            &format!(
                "SELECT version, name, checksum, applied_at FROM {} ORDER BY version",
                self.table
            ),
            &[],
        )?;
        let mut entries = rows
            .into_iter()
            .map(|row| self.parse_entry(row))
            .collect::<EngineResult<Vec<_>>>()?;
        // Text order matches version order only for canonical rows.
        entries.sort_by_key(|e| e.version);
        Ok(entries)
    }

    pub fn entry(&self, version: MigrationVersion) -> EngineResult<Option<LedgerEntry>> {
        let rows = self.db.query_rows(
            &format!(
                "SELECT version, name, checksum, applied_at FROM {} WHERE version = ?",
                self.table
            ),
            &[version.to_string().as_str()],
        )?;
        rows.into_iter()
            .next()
            .map(|row| self.parse_entry(row))
            .transpose()
    }

    fn parse_entry(&self, row: Row) -> EngineResult<LedgerEntry> {
        let mut cells = row.into_iter();
        let version = self.parse_version(cells.next().flatten())?;
        let name = self.required(cells.next().flatten(), "name", version)?;
        let checksum = self.required(cells.next().flatten(), "checksum", version)?;
        let applied_at = self.required(cells.next().flatten(), "applied_at", version)?;
        let applied_at = DateTime::parse_from_rfc3339(&applied_at)
            .map_err(|e| self.corrupt(format!("bad applied_at for {version}: {e}")))?
            .with_timezone(&Utc);
        Ok(LedgerEntry {
            version,
            name,
            checksum,
            applied_at,
        })
    }

    fn parse_version(&self, cell: Option<String>) -> EngineResult<MigrationVersion> {
        let raw = cell.ok_or_else(|| self.corrupt("NULL version".to_string()))?;
        MigrationVersion::parse(&raw).map_err(|e| self.corrupt(e.to_string()))
    }

    fn required(
        &self,
        cell: Option<String>,
        column: &str,
        version: MigrationVersion,
    ) -> EngineResult<String> {
        cell.ok_or_else(|| self.corrupt(format!("NULL {column} for {version}")))
    }

    fn corrupt(&self, message: String) -> EngineError {
        EngineError::LedgerCorrupt {
            table: self.table.clone(),
            message,
        }
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
