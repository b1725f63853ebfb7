//! Instance-bound models.
//!
//! A [`LocalModel`] is derived from a value of an [`Entity`] type. Its
//! fields borrow their declarations from the cached [`Shape`] and hold the
//! instance's values; writes go to the holders until the model is
//! materialized back into the native type with [`LocalModel::interface`].

use std::sync::Arc;

use serde_json::Value as Json;

use super::entity::Entity;
use super::json::{basic_from_json, to_json};
use super::shape::{FieldShape, Presentation, Shape};
use super::spec::{Spec, View};
use super::traits::{check_value, Field, Model};
use super::types::TypeDesc;
use super::value::{FieldValue, Holder};
use crate::error::{Error, Result};
use crate::provider::ShapeCache;

/// A field of an instance-bound model.
#[derive(Debug, Clone)]
pub struct LocalField {
    shape: Arc<Shape>,
    index: usize,
    holder: Holder,
}

impl LocalField {
    fn decl(&self) -> &FieldShape {
        &self.shape.fields[self.index]
    }
}

impl Field for LocalField {
    fn name(&self) -> &str {
        &self.decl().name
    }

    fn description(&self) -> &str {
        &self.decl().description
    }

    fn type_desc(&self) -> &TypeDesc {
        &self.decl().type_desc
    }

    fn spec(&self) -> &Spec {
        &self.decl().spec
    }

    fn value(&self) -> &Holder {
        &self.holder
    }

    fn set_value(&mut self, value: Option<FieldValue>) -> Result<()> {
        let value = check_value(self.name(), self.type_desc(), value)?;
        self.holder.set(value);
        Ok(())
    }

    fn take_value(&mut self) -> Option<FieldValue> {
        self.holder.take()
    }
}

/// A model bound to a live instance of an entity type.
#[derive(Debug)]
pub struct LocalModel {
    shape: Arc<Shape>,
    cache: Arc<ShapeCache>,
    fields: Vec<LocalField>,
    primary: usize,
}

impl LocalModel {
    /// Derive a model from an entity value.
    pub fn bind<T: Entity>(cache: Arc<ShapeCache>, entity: &T) -> Result<Self> {
        let shape = cache.resolve(T::declare)?;
        let json = serde_json::to_value(entity)?;
        Self::from_json(shape, cache, &json)
    }

    /// Build a model of `shape` from the JSON form of an instance.
    pub(crate) fn from_json(shape: Arc<Shape>, cache: Arc<ShapeCache>, json: &Json) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| {
            Error::Conversion(format!("'{}' instance is not a JSON object", shape.name))
        })?;

        let mut fields = Vec::with_capacity(shape.fields.len());
        for (index, decl) in shape.fields.iter().enumerate() {
            let raw = object.get(&decl.name).unwrap_or(&Json::Null);
            let value = field_from_json(&cache, decl, raw)
                .map_err(|e| annotate(e, &shape.name, &decl.name))?;
            fields.push(LocalField {
                shape: Arc::clone(&shape),
                index,
                holder: Holder::from(value),
            });
        }

        Ok(Self {
            primary: shape.primary,
            shape,
            cache,
            fields,
        })
    }

    /// Materialize the model's values as a native entity.
    pub fn interface<T: Entity>(&self) -> Result<T> {
        let expected = T::declare().key();
        if expected != self.shape.key() {
            return Err(Error::Conversion(format!(
                "model '{}' cannot materialize as '{expected}'",
                self.shape.key()
            )));
        }
        Ok(serde_json::from_value(to_json(self)?)?)
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }
}

fn annotate(err: Error, shape: &str, field: &str) -> Error {
    match err {
        Error::Conversion(message) => {
            Error::Conversion(format!("{shape}.{field}: {message}"))
        }
        other => other,
    }
}

fn field_from_json(cache: &Arc<ShapeCache>, decl: &FieldShape, raw: &Json) -> Result<Option<FieldValue>> {
    if raw.is_null() {
        return Ok(None);
    }
    if decl.type_desc.is_basic() {
        return Ok(basic_from_json(&decl.type_desc, raw)?.map(FieldValue::Basic));
    }

    let related = decl.related.ok_or_else(|| {
        Error::Relation(format!("field '{}' has no related declaration", decl.name))
    })?;
    let shape = cache.resolve(related.declare)?;
    let nested = |json: &Json| -> Result<Box<dyn Model>> {
        Ok(Box::new(LocalModel::from_json(
            Arc::clone(&shape),
            Arc::clone(cache),
            json,
        )?))
    };

    let value = match raw {
        Json::Array(items) if decl.type_desc.is_slice() => {
            FieldValue::Slice(items.iter().map(nested).collect::<Result<_>>()?)
        }
        Json::Object(_) if decl.type_desc.is_struct() => FieldValue::Struct(nested(raw)?),
        other => {
            return Err(Error::Conversion(format!(
                "{other} does not match {} '{}'",
                decl.type_desc.kind(),
                decl.type_desc.name()
            )))
        }
    };
    Ok(Some(value))
}

impl Model for LocalModel {
    fn name(&self) -> &str {
        &self.shape.name
    }

    fn pkg_key(&self) -> &str {
        &self.shape.pkg_key
    }

    fn description(&self) -> &str {
        &self.shape.description
    }

    fn presentation(&self) -> &Presentation {
        &self.shape.presentation
    }

    fn fields(&self) -> Vec<&dyn Field> {
        self.fields.iter().map(|f| f as &dyn Field).collect()
    }

    fn field(&self, name: &str) -> Option<&dyn Field> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f as &dyn Field)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Field> {
        self.fields
            .iter_mut()
            .find(|f| f.name() == name)
            .map(|f| f as &mut dyn Field)
    }

    fn primary_field(&self) -> &dyn Field {
        &self.fields[self.primary]
    }

    fn copy(&self, view: View) -> Box<dyn Model> {
        let fields: Vec<LocalField> = self
            .fields
            .iter()
            .filter(|f| f.spec().visible_in(view))
            .cloned()
            .collect();
        let primary = fields
            .iter()
            .position(|f| f.is_primary_key())
            .unwrap_or_default();
        Box::new(LocalModel {
            shape: Arc::clone(&self.shape),
            cache: Arc::clone(&self.cache),
            fields,
            primary,
        })
    }

    fn related_model(&self, field: &str) -> Result<Box<dyn Model>> {
        let decl = self
            .shape
            .field(field)
            .ok_or_else(|| Error::Relation(format!("'{}' has no field '{field}'", self.shape.name)))?;
        let related = decl.related.ok_or_else(|| {
            Error::Relation(format!("field '{field}' of '{}' is not a relation", self.shape.name))
        })?;
        let shape = self.cache.resolve(related.declare)?;
        let zero = (related.zero)()?;
        Ok(Box::new(LocalModel::from_json(
            shape,
            Arc::clone(&self.cache),
            &zero,
        )?))
    }
}
