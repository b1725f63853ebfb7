//! Entity declarations.
//!
//! A Rust type becomes mappable by implementing [`Entity`]: it declares its
//! fields and their persistence annotations once, and its values are read
//! and written through its serde representation.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Default)]
//! #[serde(default)]
//! struct Unit {
//!     id: i64,
//!     name: String,
//!     status: Option<Status>,
//! }
//!
//! impl Entity for Unit {
//!     fn declare() -> EntityDecl {
//!         EntityDecl::new("Unit", "/vmi")
//!             .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
//!             .field(FieldDecl::new("name", Kind::String))
//!             .field(FieldDecl::owned::<Status>("status"))
//!     }
//! }
//! ```

use relmap_proto::{Kind, ValueGeneration};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::shape::Presentation;
use super::spec::Spec;
use super::types::TypeDesc;
use crate::error::Result;

/// A domain type that can be mapped to tables.
///
/// Declared field names must match the serialized member names. Members
/// serialized as `null` or omitted are treated as unassigned, so types
/// should carry `#[serde(default)]` to materialize partially loaded models.
pub trait Entity: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    fn declare() -> EntityDecl;
}

/// Lazily resolved reference to a related entity type.
#[derive(Debug, Clone, Copy)]
pub struct RelatedDecl {
    pub(crate) declare: fn() -> EntityDecl,
    pub(crate) zero: fn() -> serde_json::Result<serde_json::Value>,
}

impl RelatedDecl {
    fn of<R: Entity>() -> Self {
        Self {
            declare: R::declare,
            zero: zero_json::<R>,
        }
    }
}

fn zero_json<R: Entity>() -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(R::default())
}

#[derive(Debug, Clone, Copy)]
enum DeclType {
    Basic(Kind),
    BasicSlice(Kind),
    Relation {
        related: RelatedDecl,
        pointer: bool,
        many: bool,
    },
}

/// Declaration of one field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub(crate) name: String,
    pub(crate) description: String,
    column: Option<String>,
    primary_key: bool,
    generation: ValueGeneration,
    detail: bool,
    lite: bool,
    ty: DeclType,
}

impl FieldDecl {
    fn with_type(name: impl Into<String>, ty: DeclType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            column: None,
            primary_key: false,
            generation: ValueGeneration::Customer,
            detail: false,
            lite: false,
            ty,
        }
    }

    /// A scalar field.
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self::with_type(name, DeclType::Basic(kind))
    }

    /// A slice of scalars, stored in one column.
    pub fn slice(name: impl Into<String>, elem: Kind) -> Self {
        Self::with_type(name, DeclType::BasicSlice(elem))
    }

    /// Owned single related entity.
    pub fn owned<R: Entity>(name: impl Into<String>) -> Self {
        Self::relation::<R>(name, false, false)
    }

    /// Owned collection of related entities.
    pub fn owned_many<R: Entity>(name: impl Into<String>) -> Self {
        Self::relation::<R>(name, false, true)
    }

    /// Referenced single entity; only the association is cascaded.
    pub fn reference<R: Entity>(name: impl Into<String>) -> Self {
        Self::relation::<R>(name, true, false)
    }

    /// Referenced collection of entities; only the associations are cascaded.
    pub fn references<R: Entity>(name: impl Into<String>) -> Self {
        Self::relation::<R>(name, true, true)
    }

    fn relation<R: Entity>(name: impl Into<String>, pointer: bool, many: bool) -> Self {
        Self::with_type(
            name,
            DeclType::Relation {
                related: RelatedDecl::of::<R>(),
                pointer,
                many,
            },
        )
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Store under a column name other than the field name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.generation = ValueGeneration::AutoIncrement;
        self
    }

    pub fn uuid(mut self) -> Self {
        self.generation = ValueGeneration::Uuid;
        self
    }

    pub fn snowflake(mut self) -> Self {
        self.generation = ValueGeneration::Snowflake;
        self
    }

    pub fn datetime(mut self) -> Self {
        self.generation = ValueGeneration::DateTime;
        self
    }

    /// Visible in the detail view.
    pub fn detail(mut self) -> Self {
        self.detail = true;
        self
    }

    /// Visible in the lite (and detail) view.
    pub fn lite(mut self) -> Self {
        self.lite = true;
        self.detail = true;
        self
    }

    pub(crate) fn spec(&self) -> Spec {
        Spec::new(self.column.clone().unwrap_or_else(|| self.name.clone()))
            .with_primary_key(self.primary_key)
            .with_generation(self.generation)
            .with_views(self.detail, self.lite)
    }

    pub(crate) fn related(&self) -> Option<RelatedDecl> {
        match self.ty {
            DeclType::Relation { related, .. } => Some(related),
            _ => None,
        }
    }

    /// Build the type descriptor. Relation targets are declared on demand.
    pub(crate) fn type_desc(&self) -> Result<TypeDesc> {
        match self.ty {
            DeclType::Basic(kind) => Ok(TypeDesc::basic(kind)),
            DeclType::BasicSlice(elem) => TypeDesc::slice(TypeDesc::basic(elem)),
            DeclType::Relation {
                related,
                pointer,
                many,
            } => {
                let target = (related.declare)();
                let desc = TypeDesc::structure(target.name, target.pkg_key).with_pointer(pointer);
                if many {
                    TypeDesc::slice(desc)
                } else {
                    Ok(desc)
                }
            }
        }
    }
}

/// Declaration of an entity type.
#[derive(Debug, Clone)]
pub struct EntityDecl {
    pub(crate) name: String,
    pub(crate) pkg_key: String,
    pub(crate) description: String,
    pub(crate) presentation: Presentation,
    pub(crate) fields: Vec<FieldDecl>,
}

impl EntityDecl {
    pub fn new(name: impl Into<String>, pkg_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pkg_key: pkg_key.into(),
            description: String::new(),
            presentation: Presentation::default(),
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn id(mut self, id: i64) -> Self {
        self.presentation.id = Some(id);
        self
    }

    pub fn show_name(mut self, show_name: impl Into<String>) -> Self {
        self.presentation.show_name = Some(show_name.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.presentation.icon = Some(icon.into());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Type key, `pkg_key/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.pkg_key, self.name)
    }
}
