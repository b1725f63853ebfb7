//! Export of any model into a self-describing object graph.

use std::collections::HashMap;

use relmap_proto::{
    FieldRecord, Kind, ObjectGraph, ObjectRecord, ShapeRecord, Slot, SpecRecord, TypeRecord,
};

use super::traits::Model;
use super::value::FieldValue;
use crate::error::Result;

/// Export `model`, its nested values and every shape they mention.
///
/// Shapes of unassigned relation fields are exported too, so a receiver
/// can still derive zero models for them.
pub fn export(model: &dyn Model) -> Result<ObjectGraph> {
    let mut exporter = Exporter::default();
    let root = exporter.push_object(model)?;
    exporter.graph.root = root;
    Ok(exporter.graph)
}

#[derive(Default)]
struct Exporter {
    graph: ObjectGraph,
    /// Shape signature (type key and field names) to shape index.
    interned: HashMap<String, u32>,
}

impl Exporter {
    fn signature(model: &dyn Model) -> String {
        let names: Vec<&str> = model.fields().iter().map(|f| f.name()).collect();
        format!("{}#{}", model.key(), names.join(","))
    }

    fn intern_shape(&mut self, model: &dyn Model) -> Result<u32> {
        let signature = Self::signature(model);
        if let Some(index) = self.interned.get(&signature) {
            return Ok(*index);
        }

        let presentation = model.presentation();
        let index = self.graph.add_shape(ShapeRecord {
            name: model.name().to_string(),
            pkg_key: model.pkg_key().to_string(),
            description: model.description().to_string(),
            id: presentation.id,
            show_name: presentation.show_name.clone(),
            icon: presentation.icon.clone(),
            fields: Vec::new(),
        });
        // Registered before the fields so self-referencing shapes terminate.
        self.interned.insert(signature, index);

        let mut fields = Vec::new();
        for field in model.fields() {
            let desc = field.type_desc();
            let shape = if desc.is_basic() {
                None
            } else {
                let related = model.related_model(field.name())?;
                Some(self.intern_shape(related.as_ref())?)
            };
            let spec = field.spec();
            fields.push(FieldRecord {
                name: field.name().to_string(),
                description: field.description().to_string(),
                type_record: TypeRecord {
                    kind: desc.kind(),
                    pointer: desc.is_pointer(),
                    elem: (desc.kind() == Kind::Slice).then(|| desc.elem().kind()),
                    shape,
                },
                spec: SpecRecord {
                    column: spec.column().to_string(),
                    primary_key: spec.is_primary_key(),
                    generation: spec.generation(),
                    detail: spec.in_detail(),
                    lite: spec.in_lite(),
                },
            });
        }
        self.graph.shapes[index as usize].fields = fields;
        Ok(index)
    }

    fn push_object(&mut self, model: &dyn Model) -> Result<u32> {
        let shape = self.intern_shape(model)?;
        let index = self.graph.add_object(ObjectRecord {
            shape,
            values: Vec::new(),
        });

        let mut values = Vec::new();
        for field in model.fields() {
            let slot = match field.value().get() {
                None => Slot::Unset,
                Some(FieldValue::Basic(v)) => Slot::Basic(v.clone()),
                Some(FieldValue::Struct(m)) => Slot::Object(self.push_object(m.as_ref())?),
                Some(FieldValue::Slice(items)) => Slot::Objects(
                    items
                        .iter()
                        .map(|m| self.push_object(m.as_ref()))
                        .collect::<Result<_>>()?,
                ),
            };
            values.push(slot);
        }
        self.graph.objects[index as usize].values = values;
        Ok(index)
    }
}
