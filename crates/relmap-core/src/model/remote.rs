//! Transport-bound models.
//!
//! A [`RemoteModel`] carries every field's declaration and value as plain
//! data. It is rebuilt from an [`ObjectGraph`] without access to the Rust
//! type it came from, and encodes back to the same graph.

use std::sync::Arc;

use bytes::Bytes;
use relmap_proto::{Kind, ObjectGraph, ShapeRecord, Slot, TypeRecord};

use super::graph::export;
use super::shape::{collect_problems, Presentation};
use super::spec::{Spec, View};
use super::traits::{check_value, same_structure, same_values, Field, Model};
use super::types::TypeDesc;
use super::value::{FieldValue, Holder};
use crate::error::{Error, Result};

/// Maximum nesting depth of objects in a decoded graph.
pub const MAX_GRAPH_DEPTH: usize = 128;

/// A field declaration decoded from a graph.
#[derive(Debug, Clone)]
struct RemoteFieldShape {
    name: String,
    description: String,
    type_desc: TypeDesc,
    spec: Spec,
    /// Catalog index of the related shape.
    target: Option<u32>,
}

/// A validated shape decoded from a graph.
#[derive(Debug, Clone)]
struct RemoteShape {
    name: String,
    pkg_key: String,
    description: String,
    presentation: Presentation,
    fields: Vec<RemoteFieldShape>,
    primary: usize,
}

/// Every shape a decoded graph mentions, by graph index.
#[derive(Debug)]
struct Catalog {
    shapes: Vec<RemoteShape>,
}

impl Catalog {
    fn from_records(records: &[ShapeRecord]) -> Result<Self> {
        let shapes = records
            .iter()
            .map(|record| decode_shape(records, record))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { shapes })
    }

    fn shape(&self, index: u32) -> Result<&RemoteShape> {
        self.shapes
            .get(index as usize)
            .ok_or_else(|| Error::InvalidData(format!("shape index {index} out of range")))
    }
}

fn decode_type(records: &[ShapeRecord], record: &TypeRecord) -> Result<TypeDesc> {
    let related = |index: Option<u32>| -> Result<TypeDesc> {
        let index = index
            .ok_or_else(|| Error::InvalidData("struct type without shape index".to_string()))?;
        let target = records
            .get(index as usize)
            .ok_or_else(|| Error::InvalidData(format!("shape index {index} out of range")))?;
        Ok(TypeDesc::structure(target.name.clone(), target.pkg_key.clone()))
    };

    let desc = match (record.kind, record.elem) {
        (Kind::Slice, Some(Kind::Struct)) => TypeDesc::slice(related(record.shape)?)?,
        (Kind::Slice, Some(elem)) => TypeDesc::slice(TypeDesc::basic(elem))?,
        (Kind::Slice, None) => {
            return Err(Error::InvalidData("slice type without element kind".to_string()))
        }
        (Kind::Struct, _) => related(record.shape)?,
        (kind, _) => TypeDesc::basic(kind),
    };
    Ok(desc.with_pointer(record.pointer))
}

fn decode_shape(records: &[ShapeRecord], record: &ShapeRecord) -> Result<RemoteShape> {
    let mut problems = Vec::new();
    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        match decode_type(records, &field.type_record) {
            Ok(type_desc) => fields.push(RemoteFieldShape {
                name: field.name.clone(),
                description: field.description.clone(),
                type_desc,
                spec: Spec::new(field.spec.column.clone())
                    .with_primary_key(field.spec.primary_key)
                    .with_generation(field.spec.generation)
                    .with_views(field.spec.detail, field.spec.lite),
                target: field.type_record.shape,
            }),
            Err(e) => problems.push(format!("field '{}': {e}", field.name)),
        }
    }

    let primary = collect_problems(
        &mut problems,
        fields.iter().map(|f| (f.name.as_str(), &f.type_desc, &f.spec)),
    );
    if record.fields.is_empty() {
        problems.push("no persistable fields".to_string());
    }

    match primary {
        Some(primary) if problems.is_empty() => Ok(RemoteShape {
            name: record.name.clone(),
            pkg_key: record.pkg_key.clone(),
            description: record.description.clone(),
            presentation: Presentation {
                id: record.id,
                show_name: record.show_name.clone(),
                icon: record.icon.clone(),
            },
            fields,
            primary,
        }),
        _ => Err(Error::Shape {
            shape: record.name.clone(),
            problems,
        }),
    }
}

/// A field of a transport-bound model.
#[derive(Debug, Clone)]
pub struct RemoteField {
    name: String,
    description: String,
    type_desc: TypeDesc,
    spec: Spec,
    target: Option<u32>,
    holder: Holder,
}

impl RemoteField {
    fn zeroed(shape: &RemoteFieldShape) -> Self {
        let value = match shape.type_desc.zero() {
            Some(zero) => Some(FieldValue::Basic(zero)),
            None if shape.type_desc.is_slice() => Some(FieldValue::Slice(Vec::new())),
            None => None,
        };
        Self {
            name: shape.name.clone(),
            description: shape.description.clone(),
            type_desc: shape.type_desc.clone(),
            spec: shape.spec.clone(),
            target: shape.target,
            holder: Holder::from(value),
        }
    }
}

impl Field for RemoteField {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn type_desc(&self) -> &TypeDesc {
        &self.type_desc
    }

    fn spec(&self) -> &Spec {
        &self.spec
    }

    fn value(&self) -> &Holder {
        &self.holder
    }

    fn set_value(&mut self, value: Option<FieldValue>) -> Result<()> {
        let value = check_value(&self.name, &self.type_desc, value)?;
        self.holder.set(value);
        Ok(())
    }

    fn take_value(&mut self) -> Option<FieldValue> {
        self.holder.take()
    }
}

/// A self-describing model that survives serialization.
#[derive(Debug)]
pub struct RemoteModel {
    name: String,
    pkg_key: String,
    description: String,
    presentation: Presentation,
    fields: Vec<RemoteField>,
    primary: usize,
    catalog: Arc<Catalog>,
}

impl RemoteModel {
    /// Rebuild a model from a decoded graph.
    pub fn from_graph(graph: &ObjectGraph) -> Result<Self> {
        let catalog = Arc::new(Catalog::from_records(&graph.shapes)?);
        let mut built = vec![false; graph.objects.len()];
        build(graph, &catalog, graph.root, &mut built, 0)
    }

    /// Convert any model into a transport-bound one.
    pub fn from_model(model: &dyn Model) -> Result<Self> {
        Self::from_graph(&export(model)?)
    }

    /// Decode a model from an encoded graph frame.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        Self::from_graph(&ObjectGraph::from_bytes(frame)?)
    }

    /// Encode the model and every shape it mentions into a graph frame.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(export(self)?.to_bytes()?)
    }

    /// Same identity and field structure as `other`.
    pub fn compare_object(&self, other: &dyn Model) -> bool {
        same_structure(self, other)
    }

    /// Same structure and the same values, recursively.
    pub fn compare_object_value(&self, other: &dyn Model) -> bool {
        same_values(self, other)
    }

    fn zero(catalog: &Arc<Catalog>, index: u32) -> Result<Self> {
        let shape = catalog.shape(index)?;
        Ok(Self {
            name: shape.name.clone(),
            pkg_key: shape.pkg_key.clone(),
            description: shape.description.clone(),
            presentation: shape.presentation.clone(),
            fields: shape.fields.iter().map(RemoteField::zeroed).collect(),
            primary: shape.primary,
            catalog: Arc::clone(catalog),
        })
    }
}

/// Rebuild object `index` and its children.
///
/// Every object belongs to exactly one parent, so an index met twice is a
/// shared or cyclic reference and is rejected.
fn build(
    graph: &ObjectGraph,
    catalog: &Arc<Catalog>,
    index: u32,
    built: &mut [bool],
    depth: usize,
) -> Result<RemoteModel> {
    if depth > MAX_GRAPH_DEPTH {
        return Err(Error::InvalidData(format!(
            "object {index} is nested deeper than {MAX_GRAPH_DEPTH}"
        )));
    }
    let object = graph.object(index)?;
    match built.get_mut(index as usize) {
        Some(seen) if *seen => {
            return Err(Error::InvalidData(format!(
                "object {index} is referenced more than once"
            )))
        }
        Some(seen) => *seen = true,
        None => {}
    }
    let mut model = RemoteModel::zero(catalog, object.shape)?;
    if object.values.len() != model.fields.len() {
        return Err(Error::InvalidData(format!(
            "object {index} has {} values for {} fields of '{}'",
            object.values.len(),
            model.fields.len(),
            model.name
        )));
    }

    for (field, slot) in model.fields.iter_mut().zip(&object.values) {
        let value = match slot {
            Slot::Unset => None,
            Slot::Basic(v) => Some(FieldValue::Basic(v.clone())),
            Slot::Object(child) => Some(FieldValue::Struct(Box::new(build(
                graph,
                catalog,
                *child,
                built,
                depth + 1,
            )?))),
            Slot::Objects(children) => Some(FieldValue::Slice(
                children
                    .iter()
                    .map(|child| {
                        build(graph, catalog, *child, built, depth + 1)
                            .map(|m| Box::new(m) as Box<dyn Model>)
                    })
                    .collect::<Result<_>>()?,
            )),
        };
        field.set_value(value)?;
    }
    Ok(model)
}

impl Model for RemoteModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn pkg_key(&self) -> &str {
        &self.pkg_key
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    fn fields(&self) -> Vec<&dyn Field> {
        self.fields.iter().map(|f| f as &dyn Field).collect()
    }

    fn field(&self, name: &str) -> Option<&dyn Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f as &dyn Field)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Field> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .map(|f| f as &mut dyn Field)
    }

    fn primary_field(&self) -> &dyn Field {
        &self.fields[self.primary]
    }

    fn copy(&self, view: View) -> Box<dyn Model> {
        let fields: Vec<RemoteField> = self
            .fields
            .iter()
            .filter(|f| f.spec.visible_in(view))
            .cloned()
            .collect();
        let primary = fields
            .iter()
            .position(|f| f.spec.is_primary_key())
            .unwrap_or_default();
        Box::new(RemoteModel {
            name: self.name.clone(),
            pkg_key: self.pkg_key.clone(),
            description: self.description.clone(),
            presentation: self.presentation.clone(),
            fields,
            primary,
            catalog: Arc::clone(&self.catalog),
        })
    }

    fn related_model(&self, field: &str) -> Result<Box<dyn Model>> {
        let target = self
            .fields
            .iter()
            .find(|f| f.name == field)
            .and_then(|f| f.target)
            .ok_or_else(|| {
                Error::Relation(format!("field '{field}' of '{}' is not a relation", self.name))
            })?;
        Ok(Box::new(RemoteModel::zero(&self.catalog, target)?))
    }
}
