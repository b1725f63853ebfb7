//! SQLite collaborator for the relmap engine.
//!
//! [`SqliteBuilder`] renders statements in the SQLite dialect and
//! [`SqliteExecutor`] runs them on one rusqlite connection.
//!
//! ```no_run
//! use relmap_core::Orm;
//! use relmap_sqlite::{SqliteBuilder, SqliteExecutor};
//!
//! let executor = SqliteExecutor::open_in_memory()?;
//! let orm = Orm::new(SqliteBuilder::new().with_prefix("app_"), executor);
//! # Ok::<(), relmap_core::Error>(())
//! ```

mod builder;
mod executor;

pub use builder::SqliteBuilder;
pub use executor::SqliteExecutor;

use relmap_core::{Orm, OrmConfig, Result};

/// An engine over a private in-memory database.
pub fn open_in_memory(config: OrmConfig) -> Result<Orm<SqliteBuilder, SqliteExecutor>> {
    Ok(Orm::with_config(
        SqliteBuilder::new(),
        SqliteExecutor::open_in_memory()?,
        config,
    ))
}
