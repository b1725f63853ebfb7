//! Relation-aware CRUD engine.
//!
//! [`Orm`] persists models through a [`Builder`] and an [`Executor`],
//! walking relation fields recursively:
//!
//! - owned relations create and delete the related rows with the host
//! - referenced relations only maintain association rows
//! - updates replace every relation wholesale
//! - queries resolve relations up to [`OrmConfig::max_relation_depth`]
//!
//! Every public operation runs in one transaction. Failures roll back and
//! come back annotated with the operation and field they occurred in.

mod delete;
mod insert;
mod query;
mod schema;
mod update;

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use crate::builder::{Builder, Statement};
use crate::config::OrmConfig;
use crate::error::{Error, Operation, Result, ResultExt};
use crate::executor::{ExecResult, Executor, Row};
use crate::filter::Filter;
use crate::idgen::IdGenerator;
use crate::model::{Field, Model};
use crate::transaction::Transaction;

/// The CRUD engine over one builder and one exclusive executor.
pub struct Orm<B, E> {
    builder: B,
    executor: E,
    config: OrmConfig,
    ids: IdGenerator,
    tx: Transaction,
}

impl<B: Builder, E: Executor> Orm<B, E> {
    pub fn new(builder: B, executor: E) -> Self {
        Self::with_config(builder, executor, OrmConfig::default())
    }

    pub fn with_config(builder: B, executor: E, config: OrmConfig) -> Self {
        Self {
            ids: IdGenerator::new(config.node_id),
            builder,
            executor,
            config,
            tx: Transaction::new(),
        }
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Current transaction nesting level.
    pub fn transaction_depth(&self) -> u32 {
        self.tx.depth()
    }

    pub fn into_parts(self) -> (B, E) {
        (self.builder, self.executor)
    }

    /// Run `body` in a transaction.
    ///
    /// Calls made inside `body`, including nested `transaction` calls, join
    /// the same transaction. It commits when the outermost body succeeds
    /// and rolls back when any level fails.
    pub fn transaction<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.tx.begin(&mut self.executor)?;
        match body(self) {
            Ok(value) => {
                self.tx.commit(&mut self.executor)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.tx.rollback(&mut self.executor) {
                    warn!(error = %rollback, cause = %e, "rollback failed");
                }
                Err(e)
            }
        }
    }

    fn run<T>(&mut self, operation: Operation, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.transaction(body).within(operation, None)
    }

    /// Create the tables of `model`, of every related type and of every
    /// association. Existing tables are left alone.
    pub fn create_table(&mut self, model: &dyn Model) -> Result<()> {
        debug!(model = %model.name(), "create table");
        self.run(Operation::CreateTable, |orm| {
            orm.create_tables(model, &mut HashSet::new())
        })
    }

    /// Drop the association tables of `model`, the tables of owned related
    /// types and the table of `model`.
    pub fn drop_table(&mut self, model: &dyn Model) -> Result<()> {
        debug!(model = %model.name(), "drop table");
        self.run(Operation::DropTable, |orm| {
            orm.drop_tables(model, &mut HashSet::new())
        })
    }

    /// Insert `model` and its relations.
    ///
    /// Generated keys are written back into the model.
    pub fn insert(&mut self, model: &mut dyn Model) -> Result<()> {
        debug!(model = %model.name(), "insert");
        self.run(Operation::Insert, |orm| {
            orm.insert_model(model, Operation::Insert)
        })
    }

    /// Update the row of `model` and replace all of its relations.
    pub fn update(&mut self, model: &mut dyn Model) -> Result<()> {
        debug!(model = %model.name(), "update");
        self.run(Operation::Update, |orm| orm.update_model(model))
    }

    /// Delete `model`, its owned related rows and all its associations.
    ///
    /// Returns the host rows removed.
    pub fn delete(&mut self, model: &dyn Model) -> Result<u64> {
        debug!(model = %model.name(), "delete");
        self.run(Operation::Delete, |orm| {
            orm.delete_model(model, &mut HashSet::new(), 0)
        })
    }

    /// First row matching the non-zero fields of `model`.
    ///
    /// Every relation field of the result is resolved from the store, whether
    /// or not it was nil in `model`. Nil relation fields only mean "no
    /// constraint" for the match. Query a narrower copy (see
    /// [`crate::model::View`]) to skip relations, or cap the walk with
    /// `OrmConfig::with_max_relation_depth`.
    pub fn query(&mut self, model: &dyn Model) -> Result<Box<dyn Model>> {
        debug!(model = %model.name(), "query");
        self.run(Operation::Query, |orm| {
            let filter = orm.model_filter(model)?;
            orm.fetch(model, &filter, 0)?
                .into_iter()
                .next()
                .ok_or(Error::NotFound)
        })
    }

    /// Every row matching `filter`, one copy of `model` per row.
    ///
    /// Relations are resolved as in [`Orm::query`]. A value mask narrows the
    /// copied fields and must describe the same type as `model`.
    pub fn batch_query(&mut self, model: &dyn Model, filter: &Filter) -> Result<Vec<Box<dyn Model>>> {
        debug!(model = %model.name(), predicates = filter.predicates().len(), "batch query");
        self.run(Operation::BatchQuery, |orm| orm.fetch(model, filter, 0))
    }

    /// Number of rows matching `filter`.
    pub fn count(&mut self, model: &dyn Model, filter: &Filter) -> Result<u64> {
        debug!(model = %model.name(), "count");
        self.run(Operation::Count, |orm| {
            let statement = orm.builder.build_count(model, filter)?;
            let rows = orm.fetch_rows(statement)?;
            let count = rows
                .first()
                .and_then(|row| row.get_index(0))
                .and_then(|value| value.as_i64())
                .ok_or_else(|| Error::InvalidData("count returned no value".to_string()))?;
            u64::try_from(count)
                .map_err(|_| Error::InvalidData(format!("negative count {count}")))
        })
    }

    fn execute(&mut self, statement: Statement) -> Result<ExecResult> {
        trace!(sql = %statement.sql, args = statement.args.len(), "execute");
        self.executor.execute(&statement)
    }

    fn fetch_rows(&mut self, statement: Statement) -> Result<Vec<Row>> {
        trace!(sql = %statement.sql, args = statement.args.len(), "query");
        self.executor.query(&statement)
    }
}

/// Field of `model` named `name`.
fn field_of<'a>(model: &'a dyn Model, name: &str) -> Result<&'a dyn Field> {
    model
        .field(name)
        .ok_or_else(|| Error::InvalidData(format!("model '{}' has no field '{name}'", model.name())))
}

/// Assigned primary key of `model`.
fn primary_key(model: &dyn Model) -> Result<relmap_proto::Value> {
    let key = model.primary_field();
    match key.value().basic() {
        Some(value) if !key.value().is_zero() => Ok(value.clone()),
        _ => Err(Error::InvalidData(format!(
            "'{}' has no primary key value",
            model.name()
        ))),
    }
}
