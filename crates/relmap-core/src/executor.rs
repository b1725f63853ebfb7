//! Statement executor interface.

use relmap_proto::Value;

use crate::builder::Statement;
use crate::error::Result;

/// Outcome of a non-query statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Row id generated by the store for an auto-increment key.
    pub last_insert_id: Option<i64>,
}

/// One result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Value at a column index.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Runs statements against one exclusive connection.
///
/// Transaction calls are not nested by the executor; the engine's
/// transaction scope only forwards the outermost begin and end.
pub trait Executor: Send {
    fn begin_transaction(&mut self) -> Result<()>;

    fn commit_transaction(&mut self) -> Result<()>;

    fn rollback_transaction(&mut self) -> Result<()>;

    fn execute(&mut self, statement: &Statement) -> Result<ExecResult>;

    /// Run a query and collect its rows.
    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>>;

    fn check_table_exist(&mut self, name: &str) -> Result<bool>;
}
