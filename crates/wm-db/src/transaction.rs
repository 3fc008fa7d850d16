//! Transaction guard used for every migration step.

use crate::context::RunContext;
use crate::error::DbResult;
use crate::traits::{Database, Row};
use crate::watchdog::Watchdog;

/// An open transaction on a [`Database`].
///
/// Every statement checks the [`RunContext`] first, and while the
/// transaction is open a statement that outlives the deadline (or a cancel)
/// is interrupted through the backend's interrupt handle. Such a statement
/// fails with the context's error. The transaction is rolled back on drop
/// unless [`commit`](Self::commit) or [`rollback`](Self::rollback) was
/// called.
pub struct Transaction<'a> {
    db: &'a dyn Database,
    ctx: &'a RunContext,
    watchdog: Option<Watchdog>,
    finished: bool,
}

impl<'a> Transaction<'a> {
    /// Begin a transaction, failing early if the context already expired.
    pub fn begin(db: &'a dyn Database, ctx: &'a RunContext) -> DbResult<Self> {
        ctx.check()?;
        db.begin()?;
        let watchdog = db
            .interrupt_handle()
            .map(|handle| Watchdog::arm(ctx, handle));
        Ok(Self {
            db,
            ctx,
            watchdog,
            finished: false,
        })
    }

    /// Execute one statement with positional text parameters
    pub fn execute(&self, sql: &str, params: &[&str]) -> DbResult<usize> {
        self.ctx.check()?;
        self.stopped_or(self.db.execute(sql, params))
    }

    /// Execute multiple SQL statements
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.ctx.check()?;
        self.stopped_or(self.db.execute_batch(sql))
    }

    /// Run a query inside the transaction
    pub fn query_rows(&self, sql: &str, params: &[&str]) -> DbResult<Vec<Row>> {
        self.ctx.check()?;
        self.stopped_or(self.db.query_rows(sql, params))
    }

    /// Database type identifier of the underlying connection
    pub fn db_type(&self) -> &'static str {
        self.db.db_type()
    }

    /// Commit; a context that expired in the meantime rolls back instead.
    pub fn commit(mut self) -> DbResult<()> {
        self.ctx.check()?;
        self.watchdog.take();
        self.finished = true;
        if let Err(err) = self.db.commit() {
            if let Err(e) = self.db.rollback() {
                log::warn!("Failed to roll back after failed commit: {e}");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Roll back explicitly.
    pub fn rollback(mut self) -> DbResult<()> {
        self.watchdog.take();
        self.finished = true;
        self.db.rollback()
    }

    /// An interrupted statement reports why it was stopped.
    fn stopped_or<T>(&self, result: DbResult<T>) -> DbResult<T> {
        result.map_err(|err| match self.ctx.check() {
            Err(stopped) => stopped,
            Ok(()) => err,
        })
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.watchdog.take();
        if !self.finished {
            if let Err(err) = self.db.rollback() {
                log::warn!("Failed to roll back abandoned transaction: {err}");
            }
        }
    }
}

#[cfg(test)]
#[path = "transaction_test.rs"]
mod tests;
