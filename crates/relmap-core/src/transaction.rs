//! Reentrant transaction scope.
//!
//! Nested begins increment a counter; only the outermost begin, commit and
//! rollback reach the executor. A rollback at an inner level marks the
//! scope rollback-only so the outermost commit rolls back instead.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::executor::Executor;

/// Nesting state of the transaction owned by one engine.
#[derive(Debug, Default)]
pub struct Transaction {
    depth: u32,
    rollback_only: bool,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting level, zero when no transaction is open.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    pub fn begin(&mut self, executor: &mut dyn Executor) -> Result<()> {
        if self.depth == 0 {
            executor.begin_transaction()?;
            self.rollback_only = false;
            debug!("transaction started");
        }
        self.depth += 1;
        Ok(())
    }

    pub fn commit(&mut self, executor: &mut dyn Executor) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::Transaction("commit without begin".to_string()));
        }
        self.depth -= 1;
        if self.depth > 0 {
            return Ok(());
        }

        if self.rollback_only {
            self.rollback_only = false;
            executor.rollback_transaction()?;
            return Err(Error::Transaction(
                "an inner scope failed, transaction rolled back".to_string(),
            ));
        }
        if let Err(e) = executor.commit_transaction() {
            // A failed commit can leave the store transaction open.
            if let Err(rollback) = executor.rollback_transaction() {
                warn!(error = %rollback, cause = %e, "rollback after failed commit failed");
            }
            return Err(e);
        }
        debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(&mut self, executor: &mut dyn Executor) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::Transaction("rollback without begin".to_string()));
        }
        self.depth -= 1;
        if self.depth > 0 {
            self.rollback_only = true;
            return Ok(());
        }

        self.rollback_only = false;
        if let Err(e) = executor.rollback_transaction() {
            warn!(error = %e, "transaction rollback failed");
            return Err(e);
        }
        debug!("transaction rolled back");
        Ok(())
    }
}
