//! relmap core - model abstraction, value codec and relation-aware CRUD.
//!
//! Domain types implement [`Entity`] and are handled as [`Model`]s. A
//! [`LocalProvider`] derives instance-bound models from entity values;
//! [`RemoteModel`] carries the same data across a process boundary. The
//! [`Orm`] engine persists either variant through a dialect [`Builder`]
//! and a connection [`Executor`].

pub mod builder;
pub mod codec;
pub mod config;
pub mod datetime;
pub mod error;
pub mod executor;
pub mod filter;
pub mod idgen;
pub mod model;
pub mod orm;
pub mod provider;
pub mod relation;
pub mod transaction;

pub use builder::{Builder, Statement};
pub use config::OrmConfig;
pub use error::{BackendError, Error, Operation, Result};
pub use executor::{ExecResult, Executor, Row};
pub use filter::Filter;
pub use idgen::IdGenerator;
pub use model::{
    Entity, EntityDecl, Field, FieldDecl, FieldValue, Holder, LocalModel, Model, RemoteModel,
    Shape, Spec, TypeDesc, View,
};
pub use orm::Orm;
pub use provider::{LocalProvider, ShapeCache};
pub use relation::{classify_relation, entity_table_name, relation_table_name, RelationKind};
pub use transaction::Transaction;

/// Re-export protocol types.
pub use relmap_proto as proto;
pub use relmap_proto::{Kind, Page, Predicate, SortDirection, SortSpec, Value, ValueGeneration};
