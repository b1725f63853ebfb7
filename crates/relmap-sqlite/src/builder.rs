//! SQLite statement builder.

use relmap_core::codec::pack_basic_field_value;
use relmap_core::model::{Field, Model};
use relmap_core::{entity_table_name, relation_table_name, Builder, Error, Filter, Result, Statement};
use relmap_proto::{Kind, Predicate, SortDirection, Value, ValueGeneration};

/// Builds SQLite statements for hosts and association tables.
///
/// Table names carry an optional namespace prefix. Identifiers are always
/// double-quoted.
#[derive(Debug, Clone, Default)]
pub struct SqliteBuilder {
    prefix: String,
}

impl SqliteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every table name with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Declared column type for a basic field.
fn column_type(field: &dyn Field) -> &'static str {
    let desc = field.type_desc();
    if desc.is_slice() {
        return "TEXT";
    }
    match desc.kind() {
        // No affinity, so values past i64::MAX survive as text.
        Kind::UInt64 => "BLOB",
        kind if kind.is_integer() || kind == Kind::Bool => "INTEGER",
        kind if kind.is_float() => "REAL",
        _ => "TEXT",
    }
}

/// Column value of a field, null when unassigned.
fn column_value(field: &dyn Field) -> Result<Value> {
    match field.value().basic() {
        Some(value) => pack_basic_field_value(field, value),
        None => Ok(Value::Null),
    }
}

fn basic_fields(model: &dyn Model) -> Vec<&dyn Field> {
    model.fields().into_iter().filter(|f| f.is_basic()).collect()
}

fn key_value(model: &dyn Model) -> Result<Value> {
    let key = model.primary_field();
    match column_value(key)? {
        value if value.is_zero() => Err(Error::InvalidData(format!(
            "'{}' has no primary key value",
            model.name()
        ))),
        value => Ok(value),
    }
}

impl SqliteBuilder {
    fn table(&self, model: &dyn Model) -> String {
        quote(&entity_table_name(model, &self.prefix))
    }

    fn relation_table(&self, host: &dyn Model, field: &dyn Field, related: &dyn Model) -> Result<String> {
        Ok(quote(&relation_table_name(host, field, related, &self.prefix)?))
    }

    /// WHERE clause for the predicates of `filter`, with its arguments.
    fn where_clause(&self, model: &dyn Model, filter: &Filter) -> Result<(String, Vec<Value>)> {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        for predicate in filter.predicates() {
            let name = predicate.field();
            let field = model.field(name).ok_or_else(|| {
                Error::InvalidData(format!("model '{}' has no field '{name}'", model.name()))
            })?;
            let clause = if field.is_basic() {
                self.basic_predicate(field, predicate, &mut args)?
            } else {
                self.relation_predicate(model, field, predicate, &mut args)?
            };
            clauses.push(clause);
        }

        if clauses.is_empty() {
            Ok((String::new(), args))
        } else {
            Ok((format!(" WHERE {}", clauses.join(" AND ")), args))
        }
    }

    fn basic_predicate(&self, field: &dyn Field, predicate: &Predicate, args: &mut Vec<Value>) -> Result<String> {
        let column = quote(field.column());
        let clause = match predicate {
            Predicate::Equal { value, .. } if value.is_null() => format!("{column} IS NULL"),
            Predicate::NotEqual { value, .. } if value.is_null() => format!("{column} IS NOT NULL"),
            Predicate::Equal { value, .. } => {
                args.push(pack_basic_field_value(field, value)?);
                format!("{column} = ?")
            }
            Predicate::NotEqual { value, .. } => {
                args.push(pack_basic_field_value(field, value)?);
                format!("{column} <> ?")
            }
            Predicate::Below { value, .. } => {
                args.push(pack_basic_field_value(field, value)?);
                format!("{column} < ?")
            }
            Predicate::Above { value, .. } => {
                args.push(pack_basic_field_value(field, value)?);
                format!("{column} > ?")
            }
            Predicate::In { values, .. } | Predicate::NotIn { values, .. } => {
                let negated = matches!(predicate, Predicate::NotIn { .. });
                if values.is_empty() {
                    return Ok(if negated { "1" } else { "0" }.to_string());
                }
                for value in values {
                    args.push(pack_basic_field_value(field, value)?);
                }
                let op = if negated { "NOT IN" } else { "IN" };
                format!("{column} {op} ({})", placeholders(values.len()))
            }
            Predicate::Like { pattern, .. } => {
                args.push(Value::String(pattern.clone()));
                format!("{column} LIKE ?")
            }
        };
        Ok(clause)
    }

    /// Relation predicates select hosts through the association table.
    fn relation_predicate(
        &self,
        model: &dyn Model,
        field: &dyn Field,
        predicate: &Predicate,
        args: &mut Vec<Value>,
    ) -> Result<String> {
        let related = model.related_model(field.name())?;
        let key_field = related.primary_field();
        let (negated, keys) = match predicate {
            Predicate::Equal { value, .. } => (false, vec![value.clone()]),
            Predicate::NotEqual { value, .. } => (true, vec![value.clone()]),
            Predicate::In { values, .. } => (false, values.clone()),
            Predicate::NotIn { values, .. } => (true, values.clone()),
            _ => {
                return Err(Error::Classification {
                    field: field.name().to_string(),
                    message: "relation fields only support equality and membership".to_string(),
                })
            }
        };
        if keys.is_empty() {
            return Ok(if negated { "1" } else { "0" }.to_string());
        }
        for key in &keys {
            args.push(pack_basic_field_value(key_field, key)?);
        }

        let op = if negated { "NOT IN" } else { "IN" };
        Ok(format!(
            "{} {op} (SELECT \"left\" FROM {} WHERE \"right\" IN ({}))",
            quote(model.primary_field().column()),
            self.relation_table(model, field, related.as_ref())?,
            placeholders(keys.len())
        ))
    }

    fn order_clause(&self, model: &dyn Model, filter: &Filter) -> Result<String> {
        let mut keys = Vec::new();
        for sort in filter.sort_keys() {
            let field = model
                .field(&sort.field)
                .filter(|f| f.is_basic())
                .ok_or_else(|| {
                    Error::InvalidData(format!(
                        "cannot sort '{}' by '{}'",
                        model.name(),
                        sort.field
                    ))
                })?;
            let direction = match sort.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            keys.push(format!("{} {direction}", quote(field.column())));
        }
        if keys.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" ORDER BY {}", keys.join(", ")))
        }
    }
}

impl Builder for SqliteBuilder {
    fn table_name(&self, model: &dyn Model) -> String {
        entity_table_name(model, &self.prefix)
    }

    fn relation_table_name(&self, host: &dyn Model, field: &dyn Field, related: &dyn Model) -> Result<String> {
        relation_table_name(host, field, related, &self.prefix)
    }

    fn build_create_table(&self, model: &dyn Model) -> Result<Statement> {
        let columns: Vec<String> = basic_fields(model)
            .into_iter()
            .map(|field| {
                let mut column = format!("{} {}", quote(field.column()), column_type(field));
                if field.is_primary_key() {
                    column.push_str(" PRIMARY KEY");
                    if field.spec().generation() == ValueGeneration::AutoIncrement {
                        column.push_str(" AUTOINCREMENT");
                    }
                }
                column
            })
            .collect();
        Ok(Statement::new(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table(model),
            columns.join(", ")
        )))
    }

    fn build_drop_table(&self, model: &dyn Model) -> Result<Statement> {
        Ok(Statement::new(format!("DROP TABLE IF EXISTS {}", self.table(model))))
    }

    fn build_insert(&self, model: &dyn Model) -> Result<Statement> {
        let mut columns = Vec::new();
        let mut args = Vec::new();
        for field in basic_fields(model) {
            if field.value().is_nil() {
                continue;
            }
            columns.push(quote(field.column()));
            args.push(column_value(field)?);
        }

        if columns.is_empty() {
            return Ok(Statement::new(format!(
                "INSERT INTO {} DEFAULT VALUES",
                self.table(model)
            )));
        }
        Ok(Statement::with_args(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(model),
                columns.join(", "),
                placeholders(args.len())
            ),
            args,
        ))
    }

    fn build_update(&self, model: &dyn Model) -> Result<Statement> {
        let key = model.primary_field();
        let mut assignments = Vec::new();
        let mut args = Vec::new();
        for field in basic_fields(model) {
            if field.is_primary_key() {
                continue;
            }
            assignments.push(format!("{} = ?", quote(field.column())));
            args.push(column_value(field)?);
        }
        if assignments.is_empty() {
            let column = quote(key.column());
            assignments.push(format!("{column} = {column}"));
        }
        args.push(key_value(model)?);

        Ok(Statement::with_args(
            format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.table(model),
                assignments.join(", "),
                quote(key.column())
            ),
            args,
        ))
    }

    fn build_delete(&self, model: &dyn Model) -> Result<Statement> {
        Ok(Statement::with_args(
            format!(
                "DELETE FROM {} WHERE {} = ?",
                self.table(model),
                quote(model.primary_field().column())
            ),
            vec![key_value(model)?],
        ))
    }

    fn build_query(&self, model: &dyn Model, filter: &Filter) -> Result<Statement> {
        let selected = filter.mask().unwrap_or(model);
        let columns: Vec<String> = basic_fields(selected)
            .into_iter()
            .map(|f| quote(f.column()))
            .collect();
        let (where_clause, mut args) = self.where_clause(model, filter)?;
        let order = self.order_clause(model, filter)?;

        let mut sql = format!(
            "SELECT {} FROM {}{where_clause}{order}",
            columns.join(", "),
            self.table(model)
        );
        if let Some(page) = filter.paging() {
            sql.push_str(" LIMIT ? OFFSET ?");
            args.push(Value::Int64(i64::from(page.limit)));
            args.push(Value::Int64(i64::from(page.offset)));
        }
        Ok(Statement::with_args(sql, args))
    }

    fn build_count(&self, model: &dyn Model, filter: &Filter) -> Result<Statement> {
        let (where_clause, args) = self.where_clause(model, filter)?;
        Ok(Statement::with_args(
            format!("SELECT COUNT(*) FROM {}{where_clause}", self.table(model)),
            args,
        ))
    }

    fn build_create_relation_table(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement> {
        let name = relation_table_name(host, field, related, &self.prefix)?;
        Ok(Statement::new(format!(
            "CREATE TABLE IF NOT EXISTS {table} (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"left\" {left} NOT NULL, \"right\" {right} NOT NULL); \
             CREATE INDEX IF NOT EXISTS {index} ON {table} (\"left\")",
            table = quote(&name),
            left = column_type(host.primary_field()),
            right = column_type(related.primary_field()),
            index = quote(&format!("{name}_left")),
        )))
    }

    fn build_drop_relation_table(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement> {
        Ok(Statement::new(format!(
            "DROP TABLE IF EXISTS {}",
            self.relation_table(host, field, related)?
        )))
    }

    fn build_insert_relation(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement> {
        Ok(Statement::with_args(
            format!(
                "INSERT INTO {} (\"left\", \"right\") VALUES (?, ?)",
                self.relation_table(host, field, related)?
            ),
            vec![key_value(host)?, key_value(related)?],
        ))
    }

    fn build_delete_relation(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement> {
        Ok(Statement::with_args(
            format!(
                "DELETE FROM {} WHERE \"left\" = ?",
                self.relation_table(host, field, related)?
            ),
            vec![key_value(host)?],
        ))
    }

    fn build_query_relation(
        &self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Statement> {
        Ok(Statement::with_args(
            format!(
                "SELECT \"right\" FROM {} WHERE \"left\" = ? ORDER BY \"id\"",
                self.relation_table(host, field, related)?
            ),
            vec![key_value(host)?],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{Entity, EntityDecl, FieldDecl, LocalProvider, Page, SortSpec};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Tag {
        id: String,
        text: String,
    }

    impl Entity for Tag {
        fn declare() -> EntityDecl {
            EntityDecl::new("Tag", "/vmi")
                .field(FieldDecl::new("id", Kind::String).primary_key().uuid())
                .field(FieldDecl::new("text", Kind::String))
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Meter {
        id: i64,
        serial: String,
        total: u64,
        ratio: f64,
        history: Vec<i32>,
        tags: Vec<Tag>,
    }

    impl Entity for Meter {
        fn declare() -> EntityDecl {
            EntityDecl::new("Meter", "/vmi")
                .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
                .field(FieldDecl::new("serial", Kind::String).column("serial_no").lite())
                .field(FieldDecl::new("total", Kind::UInt64))
                .field(FieldDecl::new("ratio", Kind::Float64))
                .field(FieldDecl::slice("history", Kind::Int32))
                .field(FieldDecl::references::<Tag>("tags"))
        }
    }

    fn meter() -> Box<dyn Model> {
        let provider = LocalProvider::new();
        let meter = Meter {
            id: 9,
            serial: "m-1".to_string(),
            total: u64::MAX,
            ratio: 0.5,
            history: vec![1, 2],
            tags: Vec::new(),
        };
        Box::new(provider.entity_model(&meter).unwrap())
    }

    #[test]
    fn test_create_table() {
        let builder = SqliteBuilder::new().with_prefix("app_");
        let statement = builder.build_create_table(meter().as_ref()).unwrap();
        assert_eq!(
            statement.sql,
            "CREATE TABLE IF NOT EXISTS \"app_Meter\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"serial_no\" TEXT, \"total\" BLOB, \"ratio\" REAL, \"history\" TEXT)"
        );
        assert!(statement.args.is_empty());
    }

    #[test]
    fn test_insert_packs_values() {
        let statement = SqliteBuilder::new().build_insert(meter().as_ref()).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"Meter\" (\"id\", \"serial_no\", \"total\", \"ratio\", \"history\") \
             VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(
            statement.args,
            vec![
                Value::Int64(9),
                Value::String("m-1".into()),
                Value::UInt64(u64::MAX),
                Value::Float64(0.5),
                Value::String("[1,2]".into()),
            ]
        );
    }

    #[test]
    fn test_query_with_filter() {
        let model = meter();
        let filter = Filter::new()
            .equal("serial", "m-1")
            .equal("ratio", Value::Null)
            .in_values("id", Vec::new())
            .sort(SortSpec::desc("serial"))
            .page(Page::new(10, 20))
            .value_mask(model.copy(relmap_core::model::View::Lite));
        let statement = SqliteBuilder::new().build_query(model.as_ref(), &filter).unwrap();

        assert_eq!(
            statement.sql,
            "SELECT \"id\", \"serial_no\" FROM \"Meter\" WHERE \"serial_no\" = ? AND \"ratio\" IS NULL \
             AND 0 ORDER BY \"serial_no\" DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            statement.args,
            vec![Value::String("m-1".into()), Value::Int64(10), Value::Int64(20)]
        );
    }

    #[test]
    fn test_relation_predicate() {
        let model = meter();
        let filter = Filter::new().not_in("tags", vec!["a".into(), "b".into()]);
        let statement = SqliteBuilder::new().build_count(model.as_ref(), &filter).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) FROM \"Meter\" WHERE \"id\" NOT IN \
             (SELECT \"left\" FROM \"MeterTags4Tag\" WHERE \"right\" IN (?, ?))"
        );

        let err = SqliteBuilder::new()
            .build_count(model.as_ref(), &Filter::new().like("tags", "a%"))
            .unwrap_err();
        assert!(matches!(err, Error::Classification { .. }));
    }

    #[test]
    fn test_relation_statements() {
        let builder = SqliteBuilder::new();
        let host = meter();
        let field = host.field("tags").unwrap();
        let related = host.related_model("tags").unwrap();

        let create = builder
            .build_create_relation_table(host.as_ref(), field, related.as_ref())
            .unwrap();
        assert!(create.sql.starts_with("CREATE TABLE IF NOT EXISTS \"MeterTags4Tag\""));
        assert!(create.sql.contains("\"left\" INTEGER NOT NULL, \"right\" TEXT NOT NULL"));
        assert!(create.sql.ends_with("ON \"MeterTags4Tag\" (\"left\")"));

        let lookup = builder
            .build_query_relation(host.as_ref(), field, related.as_ref())
            .unwrap();
        assert_eq!(lookup.args, vec![Value::Int64(9)]);

        // The zero related model has no key to link.
        let err = builder
            .build_insert_relation(host.as_ref(), field, related.as_ref())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }
}
