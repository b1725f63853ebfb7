use std::collections::HashSet;

use relmap_proto::Value;
use tracing::debug;

use super::{field_of, primary_key, Orm};
use crate::builder::Builder;
use crate::codec::extract_basic_field_value;
use crate::error::{Error, Operation, Result, ResultExt};
use crate::executor::Executor;
use crate::model::{relation_fields, Field, FieldValue, Model, View};
use crate::relation::classify_relation;

impl<B: Builder, E: Executor> Orm<B, E> {
    /// Delete relation contents first, then the host row.
    ///
    /// `visited` holds `type#key` identities already removed in this call.
    pub(super) fn delete_model(
        &mut self,
        model: &dyn Model,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> Result<u64> {
        if depth > self.config.max_cascade_depth {
            return Err(Error::Relation(format!(
                "cascade depth {depth} exceeds {}",
                self.config.max_cascade_depth
            )));
        }

        let key = primary_key(model)?;
        if !visited.insert(format!("{}#{key:?}", model.key())) {
            return Ok(0);
        }

        for name in relation_fields(model) {
            self.clear_relation(model, &name, visited, depth)
                .within(Operation::Delete, Some(&name))?;
        }

        let statement = self.builder.build_delete(model)?;
        Ok(self.execute(statement)?.rows_affected)
    }

    /// Remove the association rows of one relation field, and the related
    /// rows too when the relation is owned.
    pub(super) fn clear_relation(
        &mut self,
        host: &dyn Model,
        name: &str,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> Result<()> {
        let field = field_of(host, name)?;
        let kind = classify_relation(field)?;
        let related = host.related_model(name)?;

        if kind.is_owned() {
            let keys = self.related_keys(host, field, related.as_ref())?;
            debug!(model = %host.name(), field = %name, count = keys.len(), depth, "delete owned");
            for key in keys {
                let target = keyed_copy(related.as_ref(), key)?;
                self.delete_model(target.as_ref(), visited, depth + 1)?;
            }
        }

        let statement = self
            .builder
            .build_delete_relation(host, field, related.as_ref())?;
        self.execute(statement)?;
        Ok(())
    }

    /// Primary keys linked to the host through `field`, in link order.
    pub(super) fn related_keys(
        &mut self,
        host: &dyn Model,
        field: &dyn Field,
        related: &dyn Model,
    ) -> Result<Vec<Value>> {
        let statement = self.builder.build_query_relation(host, field, related)?;
        let rows = self.fetch_rows(statement)?;
        let key_field = related.primary_field();
        rows.iter()
            .map(|row| {
                let raw = row.get_index(0).ok_or_else(|| {
                    Error::InvalidData("association row without a key column".to_string())
                })?;
                extract_basic_field_value(key_field, raw)
            })
            .collect()
    }
}

/// Copy of `template` carrying `key` as its primary key.
fn keyed_copy(template: &dyn Model, key: Value) -> Result<Box<dyn Model>> {
    let mut target = template.copy(View::Origin);
    let name = target.primary_field().name().to_string();
    target.set_field_value(&name, Some(FieldValue::Basic(key)))?;
    Ok(target)
}
