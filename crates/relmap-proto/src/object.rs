//! Self-describing object graphs.
//!
//! An [`ObjectGraph`] carries one model value together with the shape of
//! every type it mentions, so a receiver can rebuild the model without
//! access to the original Rust type. Nested structs and collections are
//! stored in flat arenas and referenced by index, which keeps every record
//! non-recursive for rkyv.

use bytes::Bytes;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::Error;
use crate::framing::{encode_frame, extract_payload};
use crate::value::Value;
use crate::PROTOCOL_VERSION;

/// Primitive and composite value kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum Kind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    DateTime,
    Struct,
    Slice,
}

impl Kind {
    /// Whether this is a primitive (column-storable) kind.
    pub fn is_basic(self) -> bool {
        !matches!(self, Kind::Struct | Kind::Slice)
    }

    /// Whether this is a signed or unsigned integer kind.
    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    /// Whether this is a signed integer kind.
    pub fn is_signed_integer(self) -> bool {
        matches!(self, Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64)
    }

    /// Whether this is an unsigned integer kind.
    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            Kind::UInt8 | Kind::UInt16 | Kind::UInt32 | Kind::UInt64
        )
    }

    /// Whether this is a floating point kind.
    pub fn is_float(self) -> bool {
        matches!(self, Kind::Float32 | Kind::Float64)
    }

    /// Lowercase kind name.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::UInt8 => "uint8",
            Kind::UInt16 => "uint16",
            Kind::UInt32 => "uint32",
            Kind::UInt64 => "uint64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::DateTime => "datetime",
            Kind::Struct => "struct",
            Kind::Slice => "slice",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field's value is produced when the caller leaves it unassigned.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum ValueGeneration {
    /// Supplied by the caller.
    #[default]
    Customer,
    /// Assigned by the store on insert.
    AutoIncrement,
    /// Random UUID text.
    Uuid,
    /// Time-ordered 64-bit id.
    Snowflake,
    /// Current date-time.
    DateTime,
}

/// Type of a field as recorded in a graph.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct TypeRecord {
    pub kind: Kind,
    pub pointer: bool,
    /// Element kind for slices.
    pub elem: Option<Kind>,
    /// Index of the related shape for struct kinds and slices of structs.
    pub shape: Option<u32>,
}

/// Persistence specification of a field as recorded in a graph.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct SpecRecord {
    pub column: String,
    pub primary_key: bool,
    pub generation: ValueGeneration,
    pub detail: bool,
    pub lite: bool,
}

/// A single field declaration.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct FieldRecord {
    pub name: String,
    pub description: String,
    pub type_record: TypeRecord,
    pub spec: SpecRecord,
}

/// A model shape: identity plus ordered field declarations.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct ShapeRecord {
    pub name: String,
    pub pkg_key: String,
    pub description: String,
    pub id: Option<i64>,
    pub show_name: Option<String>,
    pub icon: Option<String>,
    pub fields: Vec<FieldRecord>,
}

impl ShapeRecord {
    /// Key identifying the shape's type.
    pub fn key(&self) -> String {
        format!("{}/{}", self.pkg_key, self.name)
    }
}

/// The value held by one field of an object.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Slot {
    /// No value assigned.
    Unset,
    /// A scalar or array value.
    Basic(Value),
    /// Index of a nested object.
    Object(u32),
    /// Indices of nested objects, in order.
    Objects(Vec<u32>),
}

/// One object: its shape index and one slot per shape field.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct ObjectRecord {
    pub shape: u32,
    pub values: Vec<Slot>,
}

/// A model value and every shape it refers to.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct ObjectGraph {
    pub version: u32,
    /// Index of the root object.
    pub root: u32,
    pub shapes: Vec<ShapeRecord>,
    pub objects: Vec<ObjectRecord>,
}

impl ObjectGraph {
    /// Create an empty graph at the current protocol version.
    pub fn new() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            root: 0,
            shapes: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Append a shape, returning its index.
    pub fn add_shape(&mut self, shape: ShapeRecord) -> u32 {
        self.shapes.push(shape);
        (self.shapes.len() - 1) as u32
    }

    /// Append an object, returning its index.
    pub fn add_object(&mut self, object: ObjectRecord) -> u32 {
        self.objects.push(object);
        (self.objects.len() - 1) as u32
    }

    /// Look up a shape by index.
    pub fn shape(&self, index: u32) -> Result<&ShapeRecord, Error> {
        self.shapes
            .get(index as usize)
            .ok_or_else(|| Error::InvalidMessage(format!("shape index {index} out of range")))
    }

    /// Look up an object by index.
    pub fn object(&self, index: u32) -> Result<&ObjectRecord, Error> {
        self.objects
            .get(index as usize)
            .ok_or_else(|| Error::InvalidMessage(format!("object index {index} out of range")))
    }

    /// Serialize the graph into a length-prefixed frame.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let payload = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        encode_frame(&payload)
    }

    /// Deserialize a graph from a length-prefixed frame.
    pub fn from_bytes(frame: &[u8]) -> Result<Self, Error> {
        let payload = extract_payload(frame)?;

        let mut aligned: rkyv::util::AlignedVec<16> = rkyv::util::AlignedVec::new();
        aligned.extend_from_slice(payload);
        let graph = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Deserialization(e.to_string()))?;

        if graph.version != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: graph.version,
            });
        }
        Ok(graph)
    }
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self::new()
    }
}
