//! Type descriptors and scalar coercion.

use relmap_proto::{Kind, Value};

use super::value::{FieldValue, Holder};
use crate::datetime;
use crate::error::{Error, Result};

/// Describes the shape of a field's value.
///
/// Struct descriptors carry the related type's name and package key;
/// slice descriptors carry their element descriptor. The pointer flag
/// of a slice is the pointer flag of its element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    kind: Kind,
    pointer: bool,
    name: String,
    pkg_key: String,
    elem: Option<Box<TypeDesc>>,
}

impl TypeDesc {
    /// Descriptor for a primitive kind.
    pub fn basic(kind: Kind) -> Self {
        Self {
            kind,
            pointer: false,
            name: kind.as_str().to_string(),
            pkg_key: String::new(),
            elem: None,
        }
    }

    /// Descriptor for a struct type.
    pub fn structure(name: impl Into<String>, pkg_key: impl Into<String>) -> Self {
        Self {
            kind: Kind::Struct,
            pointer: false,
            name: name.into(),
            pkg_key: pkg_key.into(),
            elem: None,
        }
    }

    /// Descriptor for a slice of `elem`.
    ///
    /// Slices of slices are rejected.
    pub fn slice(elem: TypeDesc) -> Result<Self> {
        if elem.kind == Kind::Slice {
            return Err(Error::Conversion(format!(
                "slice of slice '{}' is not supported",
                elem.name
            )));
        }
        Ok(Self {
            kind: Kind::Slice,
            pointer: elem.pointer,
            name: elem.name.clone(),
            pkg_key: elem.pkg_key.clone(),
            elem: Some(Box::new(elem)),
        })
    }

    /// Set the pointer flag. For slices the element is updated as well.
    pub fn with_pointer(mut self, pointer: bool) -> Self {
        self.pointer = pointer;
        if let Some(elem) = self.elem.as_mut() {
            elem.pointer = pointer;
        }
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer
    }

    /// Type name: the kind name for primitives, the related type name otherwise.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pkg_key(&self) -> &str {
        &self.pkg_key
    }

    /// Key of the related type, `pkg_key/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.pkg_key, self.name)
    }

    /// Element descriptor for slices, `self` otherwise.
    pub fn elem(&self) -> &TypeDesc {
        self.elem.as_deref().unwrap_or(self)
    }

    pub fn is_struct(&self) -> bool {
        self.kind == Kind::Struct
    }

    pub fn is_slice(&self) -> bool {
        self.kind == Kind::Slice
    }

    /// True for primitive kinds and slices of primitive kinds.
    ///
    /// Basic values fit one column; everything else is a relation.
    pub fn is_basic(&self) -> bool {
        match self.kind {
            Kind::Struct => false,
            Kind::Slice => self.elem().kind.is_basic(),
            _ => true,
        }
    }

    /// Structural problems with this descriptor, empty when valid.
    pub(crate) fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match (self.kind, self.elem.as_deref()) {
            (Kind::Slice, None) => problems.push("slice without element type".to_string()),
            (Kind::Slice, Some(elem)) if elem.kind == Kind::Slice => {
                problems.push("slice of slice".to_string())
            }
            (Kind::Slice, Some(elem)) => problems.extend(elem.problems()),
            (_, Some(_)) => problems.push(format!("{} type with element type", self.kind)),
            (Kind::Struct, None) if self.name.is_empty() => {
                problems.push("struct type without name".to_string())
            }
            _ => {}
        }
        problems
    }

    /// Zero value of a basic descriptor; `None` for relations.
    pub fn zero(&self) -> Option<Value> {
        match self.kind {
            Kind::Struct => None,
            Kind::Slice => empty_array(self.elem().kind),
            kind => Some(zero_scalar(kind)),
        }
    }

    /// Coerce `raw` into the exact kind and width this descriptor declares.
    ///
    /// Null passes through unchanged.
    pub fn coerce(&self, raw: Value) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match self.kind {
            Kind::Struct => Err(Error::Conversion(format!(
                "struct type '{}' has no scalar value",
                self.name
            ))),
            Kind::Slice => {
                let items = raw.elements().ok_or_else(|| conversion(&raw, Kind::Slice))?;
                coerce_array(self.elem().kind, items)
            }
            kind => coerce_scalar(kind, raw),
        }
    }

    /// Coerce loose elements into the array value of this slice descriptor.
    pub fn coerce_elements(&self, items: Vec<Value>) -> Result<Value> {
        if !self.is_slice() {
            return Err(Error::Conversion(format!(
                "{} type '{}' is not a slice",
                self.kind, self.name
            )));
        }
        coerce_array(self.elem().kind, items)
    }

    /// Build an initial holder, coercing `raw` when given.
    ///
    /// Without a raw value basic descriptors start at their zero value and
    /// relations start unassigned.
    pub fn interface(&self, raw: Option<Value>) -> Result<Holder> {
        match raw {
            None => Ok(Holder::from(self.zero().map(FieldValue::Basic))),
            Some(_) if !self.is_basic() => Err(Error::Conversion(format!(
                "relation type '{}' cannot hold a scalar value",
                self.name
            ))),
            Some(raw) => {
                let value = self.coerce(raw)?;
                Ok(Holder::from((!value.is_null()).then_some(FieldValue::Basic(value))))
            }
        }
    }
}

fn zero_scalar(kind: Kind) -> Value {
    match kind {
        Kind::Bool => Value::Bool(false),
        Kind::Int8 => Value::Int8(0),
        Kind::Int16 => Value::Int16(0),
        Kind::Int32 => Value::Int32(0),
        Kind::Int64 => Value::Int64(0),
        Kind::UInt8 => Value::UInt8(0),
        Kind::UInt16 => Value::UInt16(0),
        Kind::UInt32 => Value::UInt32(0),
        Kind::UInt64 => Value::UInt64(0),
        Kind::Float32 => Value::Float32(0.0),
        Kind::Float64 => Value::Float64(0.0),
        Kind::String => Value::String(String::new()),
        Kind::DateTime => Value::DateTime(0),
        Kind::Struct | Kind::Slice => Value::Null,
    }
}

fn empty_array(elem: Kind) -> Option<Value> {
    let value = match elem {
        Kind::Bool => Value::BoolArray(Vec::new()),
        k if k.is_signed_integer() => Value::IntArray(Vec::new()),
        k if k.is_unsigned_integer() => Value::UIntArray(Vec::new()),
        k if k.is_float() => Value::FloatArray(Vec::new()),
        Kind::String => Value::StringArray(Vec::new()),
        Kind::DateTime => Value::DateTimeArray(Vec::new()),
        _ => return None,
    };
    Some(value)
}

fn conversion(raw: &Value, kind: Kind) -> Error {
    Error::Conversion(format!("cannot convert {} {:?} into {kind}", raw.type_name(), raw))
}

fn integer_of(raw: &Value) -> Option<i128> {
    match raw {
        Value::Bool(v) => Some(i128::from(*v)),
        Value::Float32(_) | Value::Float64(_) => {
            let v = raw.as_f64()?;
            (v.fract() == 0.0 && v.is_finite()).then_some(v as i128)
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i128>().ok().or_else(|| {
                let v = s.parse::<f64>().ok()?;
                (v.fract() == 0.0 && v.is_finite()).then_some(v as i128)
            })
        }
        other => other
            .as_i64()
            .map(i128::from)
            .or_else(|| other.as_u64().map(i128::from)),
    }
}

fn float_of(raw: &Value) -> Option<f64> {
    match raw {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        other => other
            .as_f64()
            .or_else(|| other.as_i64().map(|v| v as f64))
            .or_else(|| other.as_u64().map(|v| v as f64)),
    }
}

fn narrow<T: TryFrom<i128>>(raw: &Value, kind: Kind) -> Result<T> {
    integer_of(raw)
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| conversion(raw, kind))
}

fn coerce_scalar(kind: Kind, raw: Value) -> Result<Value> {
    let value = match kind {
        Kind::Bool => match &raw {
            Value::Bool(v) => Value::Bool(*v),
            Value::String(s) => match s.trim() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(conversion(&raw, kind)),
            },
            other => Value::Bool(narrow::<u8>(other, kind)? != 0),
        },
        Kind::Int8 => Value::Int8(narrow(&raw, kind)?),
        Kind::Int16 => Value::Int16(narrow(&raw, kind)?),
        Kind::Int32 => Value::Int32(narrow(&raw, kind)?),
        Kind::Int64 => Value::Int64(narrow(&raw, kind)?),
        Kind::UInt8 => Value::UInt8(narrow(&raw, kind)?),
        Kind::UInt16 => Value::UInt16(narrow(&raw, kind)?),
        Kind::UInt32 => Value::UInt32(narrow(&raw, kind)?),
        Kind::UInt64 => Value::UInt64(narrow(&raw, kind)?),
        Kind::Float32 => {
            Value::Float32(float_of(&raw).ok_or_else(|| conversion(&raw, kind))? as f32)
        }
        Kind::Float64 => Value::Float64(float_of(&raw).ok_or_else(|| conversion(&raw, kind))?),
        Kind::String => match raw {
            Value::String(s) => Value::String(s),
            Value::DateTime(micros) => Value::String(datetime::format_storage(micros)?),
            Value::Bool(v) => Value::String(v.to_string()),
            ref other if other.is_array() => return Err(conversion(other, kind)),
            other => Value::String(match other.as_f64() {
                Some(v) => v.to_string(),
                None => integer_of(&other)
                    .ok_or_else(|| conversion(&other, kind))?
                    .to_string(),
            }),
        },
        Kind::DateTime => match &raw {
            Value::DateTime(micros) => Value::DateTime(*micros),
            Value::String(s) => Value::DateTime(datetime::parse(s)?),
            other => Value::DateTime(narrow::<i64>(other, kind)?),
        },
        Kind::Struct | Kind::Slice => return Err(conversion(&raw, kind)),
    };
    Ok(value)
}

fn coerce_array(elem: Kind, items: Vec<Value>) -> Result<Value> {
    let coerced = items
        .into_iter()
        .map(|item| coerce_scalar(elem, item))
        .collect::<Result<Vec<_>>>()?;

    let missing = || Error::Conversion(format!("array element is not {elem}"));
    let value = match elem {
        Kind::Bool => Value::BoolArray(
            coerced
                .iter()
                .map(|v| v.as_bool().ok_or_else(missing))
                .collect::<Result<_>>()?,
        ),
        k if k.is_signed_integer() => Value::IntArray(
            coerced
                .iter()
                .map(|v| v.as_i64().ok_or_else(missing))
                .collect::<Result<_>>()?,
        ),
        k if k.is_unsigned_integer() => Value::UIntArray(
            coerced
                .iter()
                .map(|v| v.as_u64().ok_or_else(missing))
                .collect::<Result<_>>()?,
        ),
        k if k.is_float() => Value::FloatArray(
            coerced
                .iter()
                .map(|v| v.as_f64().ok_or_else(missing))
                .collect::<Result<_>>()?,
        ),
        Kind::String => Value::StringArray(
            coerced
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    _ => Err(missing()),
                })
                .collect::<Result<_>>()?,
        ),
        Kind::DateTime => Value::DateTimeArray(
            coerced
                .iter()
                .map(|v| v.as_datetime().ok_or_else(missing))
                .collect::<Result<_>>()?,
        ),
        _ => return Err(missing()),
    };
    Ok(value)
}
