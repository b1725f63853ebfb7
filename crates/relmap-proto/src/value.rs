//! Runtime scalar values carried by fields, query predicates and statement arguments.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A scalar value that can be stored in a single column or carried over the wire.
///
/// Every primitive kind has its own exact-width variant so that a value
/// coerced into a field keeps the width the field declares.
///
/// Note: Arrays are typed (e.g., IntArray, StringArray) to avoid recursive
/// type issues with rkyv serialization. Integer arrays are widened to 64 bits;
/// the owning field's element kind carries the declared width.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 8-bit signed integer.
    Int8(i8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 8-bit unsigned integer.
    UInt8(u8),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Date-time as microseconds since Unix epoch (UTC).
    DateTime(i64),
    /// Array of booleans.
    BoolArray(Vec<bool>),
    /// Array of signed integers.
    IntArray(Vec<i64>),
    /// Array of unsigned integers.
    UIntArray(Vec<u64>),
    /// Array of floats.
    FloatArray(Vec<f64>),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of date-times (microseconds since Unix epoch).
    DateTimeArray(Vec<i64>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an array type.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::BoolArray(_)
                | Value::IntArray(_)
                | Value::UIntArray(_)
                | Value::FloatArray(_)
                | Value::StringArray(_)
                | Value::DateTimeArray(_)
        )
    }

    /// Check if this value is the default value of its kind.
    ///
    /// Null counts as zero; the Unix epoch is the zero date-time.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(v) => !*v,
            Value::Int8(v) => *v == 0,
            Value::Int16(v) => *v == 0,
            Value::Int32(v) => *v == 0,
            Value::Int64(v) => *v == 0,
            Value::UInt8(v) => *v == 0,
            Value::UInt16(v) => *v == 0,
            Value::UInt32(v) => *v == 0,
            Value::UInt64(v) => *v == 0,
            Value::Float32(v) => *v == 0.0,
            Value::Float64(v) => *v == 0.0,
            Value::String(v) => v.is_empty(),
            Value::DateTime(v) => *v == 0,
            Value::BoolArray(v) => v.is_empty(),
            Value::IntArray(v) => v.is_empty(),
            Value::UIntArray(v) => v.is_empty(),
            Value::FloatArray(v) => v.is_empty(),
            Value::StringArray(v) => v.is_empty(),
            Value::DateTimeArray(v) => v.is_empty(),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::BoolArray(_) => "bool[]",
            Value::IntArray(_) => "int[]",
            Value::UIntArray(_) => "uint[]",
            Value::FloatArray(_) => "float[]",
            Value::StringArray(_) => "string[]",
            Value::DateTimeArray(_) => "datetime[]",
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get any signed integer, widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get any unsigned integer, widened to u64.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt8(v) => Some(u64::from(*v)),
            Value::UInt16(v) => Some(u64::from(*v)),
            Value::UInt32(v) => Some(u64::from(*v)),
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get any float, widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as date-time microseconds.
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Split an array value into its scalar elements.
    ///
    /// Returns `None` for non-array values.
    pub fn elements(&self) -> Option<Vec<Value>> {
        let items = match self {
            Value::BoolArray(v) => v.iter().copied().map(Value::Bool).collect(),
            Value::IntArray(v) => v.iter().copied().map(Value::Int64).collect(),
            Value::UIntArray(v) => v.iter().copied().map(Value::UInt64).collect(),
            Value::FloatArray(v) => v.iter().copied().map(Value::Float64).collect(),
            Value::StringArray(v) => v.iter().cloned().map(Value::String).collect(),
            Value::DateTimeArray(v) => v.iter().copied().map(Value::DateTime).collect(),
            _ => return None,
        };
        Some(items)
    }
}

// Conversion implementations
macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<bool> => BoolArray,
    Vec<i64> => IntArray,
    Vec<u64> => UIntArray,
    Vec<f64> => FloatArray,
    Vec<String> => StringArray,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
