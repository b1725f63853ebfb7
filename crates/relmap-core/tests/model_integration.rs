//! Integration tests for model derivation, transport and the shape cache.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use relmap_core::model::{same_structure, same_values, View};
use relmap_core::{
    Entity, EntityDecl, Error, FieldDecl, FieldValue, Kind, LocalProvider, Model, RemoteModel,
    Value,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Status {
    id: i64,
    code: String,
}

impl Entity for Status {
    fn declare() -> EntityDecl {
        EntityDecl::new("Status", "/vmi")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("code", Kind::String).lite())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Label {
    id: String,
    text: String,
}

impl Entity for Label {
    fn declare() -> EntityDecl {
        EntityDecl::new("Label", "/vmi")
            .field(FieldDecl::new("id", Kind::String).primary_key().uuid())
            .field(FieldDecl::new("text", Kind::String))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Sensor {
    id: i64,
    name: String,
    level: i8,
    ratio: f32,
    enabled: bool,
    seen: DateTime<Utc>,
    readings: Vec<u16>,
    status: Option<Status>,
    labels: Vec<Label>,
}

impl Entity for Sensor {
    fn declare() -> EntityDecl {
        EntityDecl::new("Sensor", "/vmi")
            .description("a field sensor")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("name", Kind::String).lite())
            .field(FieldDecl::new("level", Kind::Int8).detail())
            .field(FieldDecl::new("ratio", Kind::Float32))
            .field(FieldDecl::new("enabled", Kind::Bool))
            .field(FieldDecl::new("seen", Kind::DateTime).detail())
            .field(FieldDecl::slice("readings", Kind::UInt16))
            .field(FieldDecl::owned::<Status>("status"))
            .field(FieldDecl::references::<Label>("labels"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Keyless {
    name: String,
}

impl Entity for Keyless {
    fn declare() -> EntityDecl {
        EntityDecl::new("Keyless", "/vmi").field(FieldDecl::new("name", Kind::String))
    }
}

fn sample() -> Sensor {
    Sensor {
        id: 7,
        name: "gauge".to_string(),
        level: -3,
        ratio: 0.25,
        enabled: true,
        seen: Utc.with_ymd_and_hms(2018, 1, 2, 15, 4, 5).unwrap(),
        readings: vec![1, 512, 65535],
        status: Some(Status {
            id: 2,
            code: "ok".to_string(),
        }),
        labels: vec![
            Label {
                id: "l-1".to_string(),
                text: "north".to_string(),
            },
            Label {
                id: "l-2".to_string(),
                text: "south".to_string(),
            },
        ],
    }
}

#[test]
fn test_local_model_round_trip() {
    let provider = LocalProvider::new();
    let model = provider.entity_model(&sample()).unwrap();

    assert_eq!(model.name(), "Sensor");
    assert_eq!(model.key(), "/vmi/Sensor");
    assert_eq!(model.description(), "a field sensor");
    assert_eq!(model.primary_field().name(), "id");
    assert_eq!(
        model.field("level").unwrap().value().basic(),
        Some(&Value::Int8(-3))
    );
    assert!(model.field("status").unwrap().is_struct());
    assert!(model.field("labels").unwrap().is_slice());

    let back: Sensor = model.interface().unwrap();
    assert_eq!(back, sample());
}

#[test]
fn test_zero_model_leaves_fields_unassigned() {
    let provider = LocalProvider::new();
    let model = provider.type_model::<Sensor>().unwrap();

    assert!(model.field("status").unwrap().value().is_nil());
    assert!(model.fields().iter().all(|f| f.value().is_zero()));
    assert_eq!(provider.materialize::<Sensor>(&model).unwrap(), Sensor::default());
}

#[test]
fn test_copy_by_view() {
    let provider = LocalProvider::new();
    let model = provider.entity_model(&sample()).unwrap();

    let lite = model.copy(View::Lite);
    let names: Vec<&str> = lite.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "name"]);

    let detail = model.copy(View::Detail);
    let names: Vec<&str> = detail.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "name", "level", "seen"]);

    let origin = model.copy(View::Origin);
    assert!(same_values(&model, origin.as_ref()));
}

#[test]
fn test_related_model_is_zero() {
    let provider = LocalProvider::new();
    let model = provider.entity_model(&sample()).unwrap();

    let related = model.related_model("labels").unwrap();
    assert_eq!(related.key(), "/vmi/Label");
    assert!(related.primary_field().value().is_zero());

    let err = model.related_model("name").unwrap_err();
    assert!(matches!(err, Error::Relation(_)));
}

#[test]
fn test_set_field_value_checks_type() {
    let provider = LocalProvider::new();
    let mut model = provider.entity_model(&sample()).unwrap();

    model
        .set_field_value("level", Some(FieldValue::Basic(Value::Int64(100))))
        .unwrap();
    assert_eq!(
        model.field("level").unwrap().value().basic(),
        Some(&Value::Int8(100))
    );

    let err = model
        .set_field_value("level", Some(FieldValue::Basic(Value::Int64(300))))
        .unwrap_err();
    assert!(matches!(err, Error::Conversion(_)));

    let err = model
        .set_field_value("status", Some(FieldValue::Basic(Value::Int64(1))))
        .unwrap_err();
    assert!(matches!(err, Error::Classification { .. }));

    let label = provider.type_model::<Label>().unwrap();
    let err = model
        .set_field_value("status", Some(FieldValue::Struct(Box::new(label))))
        .unwrap_err();
    assert!(matches!(err, Error::Classification { .. }));

    let err = model.set_field_value("missing", None).unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}

#[test]
fn test_remote_model_transport() {
    let provider = LocalProvider::new();
    let local = provider.entity_model(&sample()).unwrap();

    let frame = RemoteModel::from_model(&local).unwrap().encode().unwrap();
    let remote = RemoteModel::decode(&frame).unwrap();

    assert!(remote.compare_object(&local));
    assert!(remote.compare_object_value(&local));
    assert_eq!(remote.description(), "a field sensor");

    let status = remote.related_model("status").unwrap();
    assert_eq!(status.key(), "/vmi/Status");
    assert!(status.primary_field().value().is_zero());

    let back: Sensor = provider.materialize(&remote).unwrap();
    assert_eq!(back, sample());
}

#[test]
fn test_remote_model_detects_value_changes() {
    let provider = LocalProvider::new();
    let local = provider.entity_model(&sample()).unwrap();
    let mut changed = sample();
    changed.labels[1].text = "west".to_string();
    let other = provider.entity_model(&changed).unwrap();

    let remote = RemoteModel::from_model(&local).unwrap();
    assert!(same_structure(&remote, &other));
    assert!(!remote.compare_object_value(&other));

    let status = provider.type_model::<Status>().unwrap();
    assert!(!remote.compare_object(&status));
}

#[test]
fn test_remote_decode_rejects_garbage() {
    assert!(RemoteModel::decode(&[0, 0, 0, 3, 1, 2, 3]).is_err());
    assert!(RemoteModel::decode(&[]).is_err());
}

#[test]
fn test_materialize_checks_type() {
    let provider = LocalProvider::new();
    let model = provider.entity_model(&sample()).unwrap();
    let err = provider.materialize::<Status>(&model).unwrap_err();
    assert!(matches!(err, Error::Conversion(_)));
}

#[test]
fn test_invalid_entity_is_rejected() {
    let provider = LocalProvider::new();
    let err = provider.type_model::<Keyless>().unwrap_err();
    match err {
        Error::Shape { shape, problems } => {
            assert_eq!(shape, "Keyless");
            assert!(problems.contains(&"no primary key".to_string()));
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(provider.cache().is_empty());
}

#[test]
fn test_shape_cache_shared_across_threads() {
    let provider = LocalProvider::new();
    let threads: Vec<_> = (0..8)
        .map(|i| {
            let provider = provider.clone();
            thread::spawn(move || {
                let status = Status {
                    id: i,
                    code: format!("s{i}"),
                };
                let model = provider.entity_model(&status).unwrap();
                Arc::clone(model.shape())
            })
        })
        .collect();

    let shapes: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
    assert_eq!(provider.cache().len(), 1);
    assert!(provider.cache().contains("/vmi/Status"));
    let stats = provider.cache().stats();
    assert_eq!(stats.hits() + stats.misses(), 8);

    let cached = provider.cache().get("/vmi/Status").unwrap();
    assert!(shapes.iter().all(|s| s.key() == cached.key()));
}
