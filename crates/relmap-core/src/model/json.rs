//! Conversion between field values and their serde JSON representation.
//!
//! Instance-bound models read and write native values through this form,
//! and slice-of-scalar columns use its compact text.

use relmap_proto::Value;
use serde_json::{Map, Number, Value as Json};

use super::traits::Model;
use super::types::TypeDesc;
use super::value::FieldValue;
use crate::datetime;
use crate::error::{Error, Result};

fn scalar_from_json(json: &Json) -> Result<Value> {
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::Bool(*v),
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Int64(v)
            } else if let Some(v) = n.as_u64() {
                Value::UInt64(v)
            } else {
                Value::Float64(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(_) | Json::Object(_) => {
            return Err(Error::Conversion(format!("{json} is not a scalar")))
        }
    };
    Ok(value)
}

/// Read a basic value declared as `desc` from JSON.
///
/// Returns `None` for JSON null.
pub(crate) fn basic_from_json(desc: &TypeDesc, json: &Json) -> Result<Option<Value>> {
    let value = match json {
        Json::Null => return Ok(None),
        Json::Array(items) if desc.is_slice() => {
            let items = items
                .iter()
                .map(scalar_from_json)
                .collect::<Result<Vec<_>>>()?;
            desc.coerce_elements(items)?
        }
        other => desc.coerce(scalar_from_json(other)?)?,
    };
    Ok(Some(value))
}

fn float_json(v: f64) -> Json {
    Number::from_f64(v).map_or(Json::Null, Json::Number)
}

fn datetime_json(micros: i64) -> Result<Json> {
    Ok(Json::String(datetime::format_rfc3339(micros)?))
}

/// JSON representation of a scalar or array value.
pub(crate) fn value_to_json(value: &Value) -> Result<Json> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::UInt8(v) => Json::from(*v),
        Value::UInt16(v) => Json::from(*v),
        Value::UInt32(v) => Json::from(*v),
        Value::UInt64(v) => Json::from(*v),
        Value::Float32(v) => float_json(f64::from(*v)),
        Value::Float64(v) => float_json(*v),
        Value::String(v) => Json::String(v.clone()),
        Value::DateTime(v) => datetime_json(*v)?,
        Value::BoolArray(v) => Json::from(v.clone()),
        Value::IntArray(v) => Json::from(v.clone()),
        Value::UIntArray(v) => Json::from(v.clone()),
        Value::FloatArray(v) => Json::Array(v.iter().copied().map(float_json).collect()),
        Value::StringArray(v) => Json::from(v.clone()),
        Value::DateTimeArray(v) => Json::Array(
            v.iter()
                .copied()
                .map(datetime_json)
                .collect::<Result<_>>()?,
        ),
    };
    Ok(json)
}

/// JSON object of a model's assigned fields, keyed by field name.
///
/// Unassigned fields are omitted so the native type's defaults apply.
pub fn to_json(model: &dyn Model) -> Result<Json> {
    let mut object = Map::new();
    for field in model.fields() {
        let Some(value) = field.value().get() else {
            continue;
        };
        let json = match value {
            FieldValue::Basic(v) => value_to_json(v)?,
            FieldValue::Struct(m) => to_json(m.as_ref())?,
            FieldValue::Slice(items) => Json::Array(
                items
                    .iter()
                    .map(|m| to_json(m.as_ref()))
                    .collect::<Result<_>>()?,
            ),
        };
        object.insert(field.name().to_string(), json);
    }
    Ok(Json::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_proto::Kind;

    #[test]
    fn test_basic_from_json() {
        let desc = TypeDesc::basic(Kind::UInt16);
        assert_eq!(
            basic_from_json(&desc, &Json::from(512)).unwrap(),
            Some(Value::UInt16(512))
        );
        assert_eq!(basic_from_json(&desc, &Json::Null).unwrap(), None);
        assert!(basic_from_json(&desc, &Json::from(-1)).is_err());

        let stamp = TypeDesc::basic(Kind::DateTime);
        assert_eq!(
            basic_from_json(&stamp, &Json::from("2018-01-02T15:04:05Z")).unwrap(),
            Some(Value::DateTime(1_514_905_445_000_000))
        );
    }

    #[test]
    fn test_slice_from_json() {
        let desc = TypeDesc::slice(TypeDesc::basic(Kind::Float32)).unwrap();
        let json: Json = serde_json::from_str("[1.5, 2]").unwrap();
        assert_eq!(
            basic_from_json(&desc, &json).unwrap(),
            Some(Value::FloatArray(vec![1.5, 2.0]))
        );
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(&Value::Int8(-3)).unwrap(), Json::from(-3));
        assert_eq!(
            value_to_json(&Value::DateTime(0)).unwrap(),
            Json::from("1970-01-01T00:00:00Z")
        );
        assert_eq!(
            value_to_json(&Value::StringArray(vec!["a".into()])).unwrap(),
            serde_json::json!(["a"])
        );
        assert_eq!(value_to_json(&Value::Float64(f64::NAN)).unwrap(), Json::Null);
    }
}
