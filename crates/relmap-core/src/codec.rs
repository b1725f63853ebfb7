//! Value codec between field values and storable column values.
//!
//! Scalars keep their fixed-width value, date-times become storage text
//! and slices of scalars become compact JSON text so they fit one column.
//! Struct and slice-of-struct fields pack to the related primary key(s);
//! the engine uses those keys for association rows and filter predicates.

use relmap_proto::{Kind, Value};

use crate::datetime;
use crate::error::{Error, Result};
use crate::model::{basic_from_json, value_to_json, Field, FieldValue};

/// Encode a basic field value into its column value.
pub fn pack_basic_field_value(field: &dyn Field, value: &Value) -> Result<Value> {
    let desc = field.type_desc();
    if !desc.is_basic() {
        return Err(Error::classification(field.name(), "is not a basic field"));
    }
    if value.is_null() {
        return Ok(Value::Null);
    }

    let value = desc
        .coerce(value.clone())
        .map_err(|e| Error::Conversion(format!("field '{}': {e}", field.name())))?;
    match value {
        ref array if desc.is_slice() => {
            let json = value_to_json(array)?;
            Ok(Value::String(serde_json::to_string(&json)?))
        }
        Value::DateTime(micros) => Ok(Value::String(datetime::format_storage(micros)?)),
        scalar => Ok(scalar),
    }
}

/// Decode a column value into the field's declared kind.
///
/// Null stays null. Empty text decodes to the zero value of a slice field.
pub fn extract_basic_field_value(field: &dyn Field, column: &Value) -> Result<Value> {
    let desc = field.type_desc();
    if !desc.is_basic() {
        return Err(Error::classification(field.name(), "is not a basic field"));
    }
    if column.is_null() {
        return Ok(Value::Null);
    }

    let decoded = if desc.is_slice() {
        match column {
            Value::String(text) if text.trim().is_empty() => desc.zero().unwrap_or(Value::Null),
            Value::String(text) => {
                let json: serde_json::Value = serde_json::from_str(text)?;
                basic_from_json(desc, &json)?.unwrap_or(Value::Null)
            }
            other => desc.coerce(other.clone())?,
        }
    } else {
        desc.coerce(column.clone())?
    };
    Ok(decoded)
}

/// Primary key of the model held by a struct field.
///
/// Returns null when the value is unassigned.
pub fn pack_struct_field_value(field: &dyn Field, value: Option<&FieldValue>) -> Result<Value> {
    if !field.is_struct() {
        return Err(Error::classification(field.name(), "is not a struct field"));
    }
    match value {
        None => Ok(Value::Null),
        Some(FieldValue::Struct(model)) => {
            let key = model.primary_field();
            match key.value().basic() {
                Some(v) => pack_basic_field_value(key, v),
                None => Ok(Value::Null),
            }
        }
        Some(_) => Err(Error::classification(
            field.name(),
            "holds a value that is not a struct",
        )),
    }
}

/// Primary keys of the models held by a slice-of-struct field, in order.
pub fn pack_slice_struct_field_value(
    field: &dyn Field,
    value: Option<&FieldValue>,
) -> Result<Vec<Value>> {
    let desc = field.type_desc();
    if desc.kind() != Kind::Slice || desc.is_basic() {
        return Err(Error::classification(
            field.name(),
            "is not a slice-of-struct field",
        ));
    }
    match value {
        None => Ok(Vec::new()),
        Some(FieldValue::Slice(models)) => models
            .iter()
            .map(|model| {
                let key = model.primary_field();
                match key.value().basic() {
                    Some(v) => pack_basic_field_value(key, v),
                    None => Ok(Value::Null),
                }
            })
            .collect(),
        Some(_) => Err(Error::classification(
            field.name(),
            "holds a value that is not a struct collection",
        )),
    }
}
