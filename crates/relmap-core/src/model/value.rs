//! Field values and the holder that carries them.

use relmap_proto::Value;

use super::spec::View;
use super::traits::{same_values, Model};

/// The concrete value of one field.
#[derive(Debug)]
pub enum FieldValue {
    /// A scalar or slice-of-scalar value.
    Basic(Value),
    /// A related model.
    Struct(Box<dyn Model>),
    /// An ordered collection of related models.
    Slice(Vec<Box<dyn Model>>),
}

impl FieldValue {
    /// Zero-ness: zero scalar, related model with a zero primary key, or empty collection.
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Basic(v) => v.is_zero(),
            FieldValue::Struct(m) => m.primary_field().value().is_zero(),
            FieldValue::Slice(items) => items.is_empty(),
        }
    }

    /// The scalar, if this is a basic value.
    pub fn as_basic(&self) -> Option<&Value> {
        match self {
            FieldValue::Basic(v) => Some(v),
            _ => None,
        }
    }

    /// Deep value comparison.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Basic(a), FieldValue::Basic(b)) => a == b,
            (FieldValue::Struct(a), FieldValue::Struct(b)) => same_values(a.as_ref(), b.as_ref()),
            (FieldValue::Slice(a), FieldValue::Slice(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| same_values(x.as_ref(), y.as_ref()))
            }
            _ => false,
        }
    }
}

impl Clone for FieldValue {
    fn clone(&self) -> Self {
        match self {
            FieldValue::Basic(v) => FieldValue::Basic(v.clone()),
            FieldValue::Struct(m) => FieldValue::Struct(m.copy(View::Origin)),
            FieldValue::Slice(items) => {
                FieldValue::Slice(items.iter().map(|m| m.copy(View::Origin)).collect())
            }
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Basic(value)
    }
}

/// Runtime container for a field's current value.
///
/// Nil and zero are independent: an unassigned holder is nil, a holder
/// carrying a default value is zero but not nil.
#[derive(Debug, Clone, Default)]
pub struct Holder {
    value: Option<FieldValue>,
}

impl Holder {
    /// An unassigned holder.
    pub fn nil() -> Self {
        Self { value: None }
    }

    pub fn new(value: FieldValue) -> Self {
        Self { value: Some(value) }
    }

    pub fn get(&self) -> Option<&FieldValue> {
        self.value.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut FieldValue> {
        self.value.as_mut()
    }

    /// The scalar value, if one is assigned.
    pub fn basic(&self) -> Option<&Value> {
        self.value.as_ref().and_then(FieldValue::as_basic)
    }

    /// Replace the value wholesale.
    pub fn set(&mut self, value: Option<FieldValue>) {
        self.value = value;
    }

    /// Remove and return the value, leaving the holder nil.
    pub fn take(&mut self) -> Option<FieldValue> {
        self.value.take()
    }

    pub fn is_nil(&self) -> bool {
        self.value.is_none()
    }

    /// Nil holders count as zero.
    pub fn is_zero(&self) -> bool {
        self.value.as_ref().map_or(true, FieldValue::is_zero)
    }

    /// Deep comparison of two holders.
    pub fn same_as(&self, other: &Holder) -> bool {
        match (&self.value, &other.value) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl From<Option<FieldValue>> for Holder {
    fn from(value: Option<FieldValue>) -> Self {
        Self { value }
    }
}
