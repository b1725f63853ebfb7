use tracing::{debug, warn};

use super::{field_of, Orm};
use crate::builder::Builder;
use crate::codec::{extract_basic_field_value, pack_slice_struct_field_value, pack_struct_field_value};
use crate::error::{Error, Operation, Result, ResultExt};
use crate::executor::{Executor, Row};
use crate::filter::Filter;
use crate::model::{relation_fields, FieldValue, Model, View};

impl<B: Builder, E: Executor> Orm<B, E> {
    /// Equality predicates for the non-zero fields of `model`.
    ///
    /// Struct fields match on the related primary key, slice fields on any
    /// of the related keys. Relations to the model's own type are skipped.
    pub(super) fn model_filter(&self, model: &dyn Model) -> Result<Filter> {
        let mut filter = Filter::new();
        for field in model.fields() {
            let holder = field.value();
            if holder.is_zero() {
                continue;
            }
            let name = field.name();
            if field.is_basic() {
                if let Some(value) = holder.basic() {
                    filter = filter.equal(name, value.clone());
                }
            } else if field.type_desc().elem().key() == model.key() {
                continue;
            } else if field.is_struct() {
                let key = pack_struct_field_value(field, holder.get()).within(Operation::Query, Some(name))?;
                if !key.is_null() {
                    filter = filter.equal(name, key);
                }
            } else {
                let keys = pack_slice_struct_field_value(field, holder.get())
                    .within(Operation::Query, Some(name))?;
                if !keys.is_empty() {
                    filter = filter.in_values(name, keys);
                }
            }
        }
        Ok(filter)
    }

    /// Rows matching `filter`, each materialized as a copy of the template.
    ///
    /// The template is the filter's mask when one is set, `model` otherwise.
    pub(super) fn fetch(
        &mut self,
        model: &dyn Model,
        filter: &Filter,
        depth: usize,
    ) -> Result<Vec<Box<dyn Model>>> {
        let template = match filter.mask() {
            Some(mask) if mask.key() != model.key() => {
                return Err(Error::InvalidData(format!(
                    "value mask '{}' does not match model '{}'",
                    mask.key(),
                    model.key()
                )));
            }
            Some(mask) => mask,
            None => model,
        };
        let statement = self.builder.build_query(model, filter)?;
        let rows = self.fetch_rows(statement)?;

        let mut models = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut item = template.copy(View::Origin);
            assign_row(item.as_mut(), row)?;
            for name in relation_fields(item.as_ref()) {
                self.resolve_relation(item.as_mut(), &name, depth)
                    .within(Operation::Query, Some(&name))?;
            }
            models.push(item);
        }
        Ok(models)
    }

    fn resolve_relation(&mut self, item: &mut dyn Model, name: &str, depth: usize) -> Result<()> {
        let collection = field_of(&*item, name)?.is_slice();
        if depth >= self.config.max_relation_depth {
            warn!(model = %item.name(), field = %name, depth, "relation depth cap reached");
            let empty = collection.then(|| FieldValue::Slice(Vec::new()));
            return item.set_field_value(name, empty);
        }

        let related = item.related_model(name)?;
        let keys = self.related_keys(&*item, field_of(&*item, name)?, related.as_ref())?;
        debug!(model = %item.name(), field = %name, count = keys.len(), depth, "resolve relation");

        let key_name = related.primary_field().name().to_string();
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            let filter = Filter::new().equal(key_name.clone(), key);
            found.extend(self.fetch(related.as_ref(), &filter, depth + 1)?);
        }

        let value = if collection {
            Some(FieldValue::Slice(found))
        } else {
            found.into_iter().next().map(FieldValue::Struct)
        };
        item.set_field_value(name, value)
    }
}

/// Decode the basic columns of `row` into `item`. Absent columns leave
/// the field unassigned.
fn assign_row(item: &mut dyn Model, row: &Row) -> Result<()> {
    let basics: Vec<String> = item
        .fields()
        .iter()
        .filter(|f| f.is_basic())
        .map(|f| f.name().to_string())
        .collect();

    for name in basics {
        let field = field_of(&*item, &name)?;
        let value = match row.get(field.column()) {
            Some(raw) => {
                let decoded =
                    extract_basic_field_value(field, raw).within(Operation::Query, Some(&name))?;
                (!decoded.is_null()).then_some(FieldValue::Basic(decoded))
            }
            None => None,
        };
        item.set_field_value(&name, value)?;
    }
    Ok(())
}
