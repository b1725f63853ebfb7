//! Statement builder interface.
//!
//! A [`Builder`] turns models and filters into dialect-specific SQL text
//! with bound parameters. The engine never writes SQL itself.

use relmap_proto::Value;

use crate::error::Result;
use crate::filter::Filter;
use crate::model::{Field, Model};

/// SQL text plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// Builds statements for host tables and association tables.
///
/// Relation methods take the host model, one of its relation fields and
/// the related model. Association tables have three columns: `id`, `left`
/// (host primary key) and `right` (related primary key).
pub trait Builder: Send + Sync {
    /// Name of the table storing `model`.
    fn table_name(&self, model: &dyn Model) -> String;

    /// Name of the association table for `field`.
    fn relation_table_name(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<String>;

    fn build_create_table(&self, model: &dyn Model) -> Result<Statement>;

    fn build_drop_table(&self, model: &dyn Model) -> Result<Statement>;

    /// Insert the assigned basic fields of `model`.
    fn build_insert(&self, model: &dyn Model) -> Result<Statement>;

    /// Update every non-key basic column, keyed by the primary key.
    fn build_update(&self, model: &dyn Model) -> Result<Statement>;

    /// Delete the row keyed by the primary key.
    fn build_delete(&self, model: &dyn Model) -> Result<Statement>;

    /// Select rows of `model` matching `filter`.
    ///
    /// Selects the basic columns of the filter's mask when one is set.
    fn build_query(&self, model: &dyn Model, filter: &Filter) -> Result<Statement>;

    /// Count rows of `model` matching `filter`. Yields one integer column.
    fn build_count(&self, model: &dyn Model, filter: &Filter) -> Result<Statement>;

    fn build_create_relation_table(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement>;

    fn build_drop_relation_table(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement>;

    /// Link the host's primary key to the related model's primary key.
    fn build_insert_relation(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement>;

    /// Remove every association row of the host.
    fn build_delete_relation(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement>;

    /// Select the `right` keys associated with the host, in insertion order.
    fn build_query_relation(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement>;
}
