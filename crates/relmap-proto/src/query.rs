//! Query predicate, ordering and paging records.
//!
//! These are the plain data a query filter is made of; statement builders
//! translate them into dialect-specific SQL.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::value::Value;

/// A single condition on a model field.
///
/// Predicates are combined conjunctively by the filter that owns them.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Predicate {
    /// Field equals value.
    Equal { field: String, value: Value },
    /// Field not equals value.
    NotEqual { field: String, value: Value },
    /// Field less than value.
    Below { field: String, value: Value },
    /// Field greater than value.
    Above { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field matches a LIKE pattern.
    Like { field: String, pattern: String },
}

impl Predicate {
    /// Create an equality predicate.
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equal {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal predicate.
    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::NotEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than predicate.
    pub fn below(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Below {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than predicate.
    pub fn above(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Above {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a membership predicate.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    /// Create a negated membership predicate.
    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::NotIn {
            field: field.into(),
            values,
        }
    }

    /// Create a LIKE predicate.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Name of the field this predicate constrains.
    pub fn field(&self) -> &str {
        match self {
            Predicate::Equal { field, .. }
            | Predicate::NotEqual { field, .. }
            | Predicate::Below { field, .. }
            | Predicate::Above { field, .. }
            | Predicate::In { field, .. }
            | Predicate::NotIn { field, .. }
            | Predicate::Like { field, .. } => field,
        }
    }
}

/// Sort specification for ordering results.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct SortSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Create an ascending sort spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Create a descending sort spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sort direction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Paging parameters.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub struct Page {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Number of rows to skip.
    pub offset: u32,
}

impl Page {
    /// Create a page with limit and offset.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Create a page with just a limit.
    pub fn limit(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }
}
