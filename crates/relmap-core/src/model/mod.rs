//! Model abstraction.
//!
//! Entity types are represented uniformly as [`Model`]s made of [`Field`]s,
//! each with a [`TypeDesc`], a [`Spec`] and a value [`Holder`]. Two
//! implementations share that capability set:
//!
//! - [`LocalModel`] - derived from a live [`Entity`] value
//! - [`RemoteModel`] - rebuilt from a transport [`relmap_proto::ObjectGraph`]

mod entity;
mod graph;
mod json;
mod local;
mod remote;
mod shape;
mod spec;
mod traits;
mod types;
mod value;

pub use entity::{Entity, EntityDecl, FieldDecl};
pub use graph::export;
pub use json::to_json;
pub use local::{LocalField, LocalModel};
pub use remote::{RemoteField, RemoteModel, MAX_GRAPH_DEPTH};
pub use shape::{FieldShape, Presentation, Shape};
pub use spec::{Spec, View};
pub use traits::{relation_fields, same_structure, same_values, Field, Model};
pub use types::TypeDesc;
pub use value::{FieldValue, Holder};

pub(crate) use json::{basic_from_json, value_to_json};
