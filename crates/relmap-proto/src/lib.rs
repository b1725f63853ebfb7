//! relmap transport types and serialization.
//!
//! This crate defines the data that crosses a process boundary: scalar
//! values, self-describing object graphs and query records. Graphs are
//! archived with rkyv and wrapped in a length-prefixed frame.
//!
//! # Modules
//!
//! - [`value`] - Scalar values for fields, predicates and statement arguments
//! - [`object`] - Kinds, shapes and flat object graphs
//! - [`query`] - Predicate, sort and page records
//! - [`framing`] - Length-prefix framing
//! - [`error`] - Protocol error types

pub mod error;
pub mod framing;
pub mod object;
pub mod query;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use object::{
    FieldRecord, Kind, ObjectGraph, ObjectRecord, ShapeRecord, Slot, SpecRecord, TypeRecord,
    ValueGeneration,
};
pub use query::{Page, Predicate, SortDirection, SortSpec};
pub use value::Value;

/// Protocol version for graph compatibility.
///
/// Every encoded graph carries this version; decoding rejects any other.
pub const PROTOCOL_VERSION: u32 = 1;
