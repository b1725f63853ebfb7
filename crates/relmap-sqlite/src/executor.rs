//! SQLite executor over one rusqlite connection.

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use relmap_core::{datetime, Error, ExecResult, Executor, Result, Row, Statement};
use relmap_proto::Value;

/// Executes statements on an exclusively owned SQLite connection.
#[derive(Debug)]
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::backend)?;
        debug!("opened in-memory sqlite database");
        Ok(Self::new(conn))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(Error::backend)?;
        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    fn bind(args: &[Value]) -> Result<Vec<SqlValue>> {
        args.iter().map(to_sql).collect()
    }
}

fn to_sql(value: &Value) -> Result<SqlValue> {
    let converted = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int8(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int16(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int32(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::UInt8(v) => SqlValue::Integer(i64::from(*v)),
        Value::UInt16(v) => SqlValue::Integer(i64::from(*v)),
        Value::UInt32(v) => SqlValue::Integer(i64::from(*v)),
        Value::UInt64(v) => match i64::try_from(*v) {
            Ok(v) => SqlValue::Integer(v),
            Err(_) => SqlValue::Text(v.to_string()),
        },
        Value::Float32(v) => SqlValue::Real(f64::from(*v)),
        Value::Float64(v) => SqlValue::Real(*v),
        Value::String(v) => SqlValue::Text(v.clone()),
        Value::DateTime(micros) => SqlValue::Text(datetime::format_storage(*micros)?),
        other => {
            return Err(Error::Conversion(format!(
                "{} must be packed before binding",
                other.type_name()
            )))
        }
    };
    Ok(converted)
}

fn from_sql(value: SqlValue) -> Result<Value> {
    match value {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Integer(v) => Ok(Value::Int64(v)),
        SqlValue::Real(v) => Ok(Value::Float64(v)),
        SqlValue::Text(v) => Ok(Value::String(v)),
        SqlValue::Blob(_) => Err(Error::InvalidData("blob columns are not mapped".to_string())),
    }
}

impl Executor for SqliteExecutor {
    fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(Error::backend)
    }

    fn commit_transaction(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(Error::backend)
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(Error::backend)
    }

    fn execute(&mut self, statement: &Statement) -> Result<ExecResult> {
        let rows_affected = if statement.args.is_empty() {
            // Parameterless statements may hold several commands.
            self.conn
                .execute_batch(&statement.sql)
                .map_err(Error::backend)?;
            self.conn.changes() as u64
        } else {
            let args = Self::bind(&statement.args)?;
            self.conn
                .execute(&statement.sql, params_from_iter(args))
                .map_err(Error::backend)? as u64
        };

        let last_insert_id = statement
            .sql
            .trim_start()
            .get(..6)
            .filter(|verb| verb.eq_ignore_ascii_case("insert"))
            .map(|_| self.conn.last_insert_rowid());
        Ok(ExecResult {
            rows_affected,
            last_insert_id,
        })
    }

    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        let args = Self::bind(&statement.args)?;
        let mut prepared = self.conn.prepare(&statement.sql).map_err(Error::backend)?;
        let columns: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = prepared
            .query(params_from_iter(args))
            .map_err(Error::backend)?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next().map_err(Error::backend)? {
            let values = (0..columns.len())
                .map(|i| row.get::<_, SqlValue>(i).map_err(Error::backend).and_then(from_sql))
                .collect::<Result<Vec<_>>>()?;
            collected.push(Row::new(columns.clone(), values));
        }
        Ok(collected)
    }

    fn check_table_exist(&mut self, name: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .map_err(Error::backend)?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> SqliteExecutor {
        let mut exec = SqliteExecutor::open_in_memory().unwrap();
        exec.execute(&Statement::new(
            "CREATE TABLE \"t\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"n\" BLOB, \"s\" TEXT); \
             CREATE INDEX \"t_s\" ON \"t\" (\"s\")",
        ))
        .unwrap();
        exec
    }

    #[test]
    fn test_execute_reports_insert_id() {
        let mut exec = executor();
        assert!(exec.check_table_exist("t").unwrap());
        assert!(!exec.check_table_exist("missing").unwrap());

        let insert = Statement::with_args(
            "INSERT INTO \"t\" (\"n\", \"s\") VALUES (?, ?)",
            vec![Value::UInt64(u64::MAX), Value::String("a".into())],
        );
        let result = exec.execute(&insert).unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));

        let update = Statement::with_args(
            "UPDATE \"t\" SET \"s\" = ? WHERE \"id\" = ?",
            vec![Value::String("b".into()), Value::Int64(1)],
        );
        let result = exec.execute(&update).unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, None);

        let rows = exec
            .query(&Statement::new("SELECT \"n\", \"s\" FROM \"t\""))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("n"), Some(&Value::String(u64::MAX.to_string())));
        assert_eq!(rows[0].get("s"), Some(&Value::String("b".into())));
    }

    #[test]
    fn test_transaction_rollback() {
        let mut exec = executor();
        exec.begin_transaction().unwrap();
        exec.execute(&Statement::with_args(
            "INSERT INTO \"t\" (\"s\") VALUES (?)",
            vec![Value::String("gone".into())],
        ))
        .unwrap();
        exec.rollback_transaction().unwrap();

        let rows = exec
            .query(&Statement::new("SELECT COUNT(*) AS \"c\" FROM \"t\""))
            .unwrap();
        assert_eq!(rows[0].get("c"), Some(&Value::Int64(0)));
    }

    #[test]
    fn test_unpacked_values_rejected() {
        let mut exec = executor();
        let err = exec
            .execute(&Statement::with_args(
                "INSERT INTO \"t\" (\"s\") VALUES (?)",
                vec![Value::StringArray(vec!["a".into()])],
            ))
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }
}
