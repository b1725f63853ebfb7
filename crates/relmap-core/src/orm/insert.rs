use relmap_proto::{Value, ValueGeneration};
use tracing::debug;

use super::{field_of, Orm};
use crate::builder::Builder;
use crate::error::{Error, Operation, Result, ResultExt};
use crate::executor::Executor;
use crate::model::{relation_fields, FieldValue, Model};
use crate::relation::classify_relation;

impl<B: Builder, E: Executor> Orm<B, E> {
    pub(super) fn insert_model(&mut self, model: &mut dyn Model, operation: Operation) -> Result<()> {
        let auto_key = self.assign_generated(model)?;
        let primary = model.primary_field();
        if primary.value().is_zero() && auto_key.as_deref() != Some(primary.name()) {
            return Err(Error::InvalidData(format!(
                "'{}.{}' has no primary key value",
                model.name(),
                primary.name()
            )));
        }

        let statement = self.builder.build_insert(model)?;
        let result = self.execute(statement)?;

        if let Some(name) = auto_key {
            let id = result.last_insert_id.ok_or_else(|| {
                Error::InvalidData(format!(
                    "store returned no id for '{}.{name}'",
                    model.name()
                ))
            })?;
            model
                .set_field_value(&name, Some(FieldValue::Basic(Value::Int64(id))))
                .within(operation, Some(&name))?;
        }

        for name in relation_fields(model) {
            self.insert_relation_field(model, &name, operation)
                .within(operation, Some(&name))?;
        }
        Ok(())
    }

    /// Fill zero fields that carry a generation policy.
    ///
    /// Returns the auto-increment key left for the store to assign.
    fn assign_generated(&self, model: &mut dyn Model) -> Result<Option<String>> {
        let pending: Vec<(String, ValueGeneration)> = model
            .fields()
            .iter()
            .filter(|f| {
                f.is_basic()
                    && f.spec().generation() != ValueGeneration::Customer
                    && f.value().is_zero()
            })
            .map(|f| (f.name().to_string(), f.spec().generation()))
            .collect();

        let mut auto_key = None;
        for (name, policy) in pending {
            match self.ids.generate(policy) {
                Some(value) => model.set_field_value(&name, Some(FieldValue::Basic(value)))?,
                None => {
                    if let Some(field) = model.field_mut(&name) {
                        field.take_value();
                    }
                    auto_key = Some(name);
                }
            }
        }
        Ok(auto_key)
    }

    /// Insert the related rows of one relation field and link them to the host.
    pub(super) fn insert_relation_field(
        &mut self,
        host: &mut dyn Model,
        name: &str,
        operation: Operation,
    ) -> Result<()> {
        let mut value = match host.field_mut(name) {
            Some(field) => field.take_value(),
            None => return Err(Error::InvalidData(format!("model '{}' has no field '{name}'", host.name()))),
        };

        let linked = self.link_related(&*host, name, value.as_mut(), operation);

        // The value goes back even when linking failed; generated keys stay.
        if let Some(field) = host.field_mut(name) {
            field.set_value(value)?;
        }
        linked
    }

    fn link_related(
        &mut self,
        host: &dyn Model,
        name: &str,
        value: Option<&mut FieldValue>,
        operation: Operation,
    ) -> Result<()> {
        let field = field_of(host, name)?;
        let kind = classify_relation(field)?;
        let items: &mut [Box<dyn Model>] = match value {
            None => return Ok(()),
            Some(FieldValue::Struct(model)) => std::slice::from_mut(model),
            Some(FieldValue::Slice(models)) => models.as_mut_slice(),
            Some(FieldValue::Basic(_)) => {
                return Err(Error::classification(name, "holds a scalar, not a relation"))
            }
        };

        for item in items.iter_mut() {
            if kind.is_owned() {
                debug!(model = %host.name(), field = %name, related = %item.name(), "insert owned");
                self.insert_model(item.as_mut(), operation)?;
            } else if item.primary_field().value().is_zero() {
                return Err(Error::Relation(format!(
                    "referenced '{}' has no primary key value",
                    item.name()
                )));
            }

            let statement = self
                .builder
                .build_insert_relation(host, field, item.as_ref())?;
            self.execute(statement)?;
        }
        Ok(())
    }
}
