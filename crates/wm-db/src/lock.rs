//! Scoped advisory lock for migration runs.

use crate::error::DbResult;
use crate::traits::Database;

/// Holds the connection-scoped migration lock until dropped.
pub struct LockGuard<'a> {
    db: &'a dyn Database,
}

impl<'a> LockGuard<'a> {
    pub fn acquire(db: &'a dyn Database) -> DbResult<Self> {
        db.acquire_lock()?;
        log::debug!("Acquired migration lock on {} database", db.db_type());
        Ok(Self { db })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.db.release_lock() {
            log::warn!("Failed to release migration lock: {err}");
        }
    }
}
