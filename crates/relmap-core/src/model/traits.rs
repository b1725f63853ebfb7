//! The capability set shared by every model implementation.

use std::fmt;

use super::shape::Presentation;
use super::spec::{Spec, View};
use super::types::TypeDesc;
use super::value::{FieldValue, Holder};
use crate::error::{Error, Result};

/// One named, typed attribute of a model with its bound value.
pub trait Field: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn type_desc(&self) -> &TypeDesc;

    fn spec(&self) -> &Spec;

    fn value(&self) -> &Holder;

    /// Assign a value, coercing scalars into the declared width.
    ///
    /// A null scalar leaves the field unassigned.
    fn set_value(&mut self, value: Option<FieldValue>) -> Result<()>;

    /// Remove the value, leaving the field unassigned.
    fn take_value(&mut self) -> Option<FieldValue>;

    fn is_primary_key(&self) -> bool {
        self.spec().is_primary_key()
    }

    fn is_basic(&self) -> bool {
        self.type_desc().is_basic()
    }

    fn is_struct(&self) -> bool {
        self.type_desc().is_struct()
    }

    fn is_slice(&self) -> bool {
        self.type_desc().is_slice()
    }

    fn column(&self) -> &str {
        self.spec().column()
    }
}

/// One entity type as an ordered set of fields plus identity.
pub trait Model: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn pkg_key(&self) -> &str;

    fn description(&self) -> &str;

    fn presentation(&self) -> &Presentation;

    fn fields(&self) -> Vec<&dyn Field>;

    fn field(&self, name: &str) -> Option<&dyn Field>;

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Field>;

    fn primary_field(&self) -> &dyn Field;

    /// Deep copy keeping the fields visible in `view`.
    fn copy(&self, view: View) -> Box<dyn Model>;

    /// A zero model of the type `field` relates to.
    fn related_model(&self, field: &str) -> Result<Box<dyn Model>>;

    /// Type key, `pkg_key/name`.
    fn key(&self) -> String {
        format!("{}/{}", self.pkg_key(), self.name())
    }

    fn set_field_value(&mut self, name: &str, value: Option<FieldValue>) -> Result<()> {
        let model = self.name().to_string();
        self.field_mut(name)
            .ok_or_else(|| Error::InvalidData(format!("model '{model}' has no field '{name}'")))?
            .set_value(value)
    }
}

/// Validate `value` against a field's declared type.
///
/// Returns the value to store, `None` when a null scalar unassigns the field.
pub(crate) fn check_value(
    field: &str,
    desc: &TypeDesc,
    value: Option<FieldValue>,
) -> Result<Option<FieldValue>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value {
        FieldValue::Basic(raw) => {
            if !desc.is_basic() {
                return Err(Error::classification(
                    field,
                    format!("is a relation to '{}', not a scalar", desc.name()),
                ));
            }
            let coerced = desc
                .coerce(raw)
                .map_err(|e| Error::Conversion(format!("field '{field}': {e}")))?;
            Ok((!coerced.is_null()).then_some(FieldValue::Basic(coerced)))
        }
        FieldValue::Struct(model) => {
            if !desc.is_struct() {
                return Err(Error::classification(field, "does not hold a single struct"));
            }
            check_related(field, desc, model.as_ref())?;
            Ok(Some(FieldValue::Struct(model)))
        }
        FieldValue::Slice(models) => {
            if !desc.is_slice() || desc.is_basic() {
                return Err(Error::classification(field, "does not hold a struct collection"));
            }
            for model in &models {
                check_related(field, desc.elem(), model.as_ref())?;
            }
            Ok(Some(FieldValue::Slice(models)))
        }
    }
}

fn check_related(field: &str, desc: &TypeDesc, model: &dyn Model) -> Result<()> {
    if model.name() != desc.name() || model.pkg_key() != desc.pkg_key() {
        return Err(Error::classification(
            field,
            format!("expects '{}' but got '{}'", desc.key(), model.key()),
        ));
    }
    Ok(())
}

/// Identity and field structure match: names, types and specs.
pub fn same_structure(a: &dyn Model, b: &dyn Model) -> bool {
    let (fa, fb) = (a.fields(), b.fields());
    a.name() == b.name()
        && a.pkg_key() == b.pkg_key()
        && fa.len() == fb.len()
        && fa.iter().zip(&fb).all(|(x, y)| {
            x.name() == y.name() && x.type_desc() == y.type_desc() && x.spec() == y.spec()
        })
}

/// Structure matches and every field holds the same value.
pub fn same_values(a: &dyn Model, b: &dyn Model) -> bool {
    same_structure(a, b)
        && a
            .fields()
            .iter()
            .zip(b.fields())
            .all(|(x, y)| x.value().same_as(y.value()))
}

/// Names of the relation fields of `model`, in declaration order.
pub fn relation_fields(model: &dyn Model) -> Vec<String> {
    model
        .fields()
        .into_iter()
        .filter(|f| !f.is_basic())
        .map(|f| f.name().to_string())
        .collect()
}
