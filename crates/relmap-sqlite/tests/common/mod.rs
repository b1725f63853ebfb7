//! Shared entities and engine fixture for the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use relmap_core::model::Model;
use relmap_core::{Entity, EntityDecl, FieldDecl, Filter, Kind, LocalProvider, Orm, OrmConfig, Result};
use relmap_sqlite::{SqliteBuilder, SqliteExecutor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub value: f64,
    pub time_stamp: DateTime<Utc>,
}

impl Entity for Unit {
    fn declare() -> EntityDecl {
        EntityDecl::new("Unit", "/vmi")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("name", Kind::String).lite())
            .field(FieldDecl::new("value", Kind::Float64).detail())
            .field(FieldDecl::new("time_stamp", Kind::DateTime).detail())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub id: i64,
    pub code: String,
}

impl Entity for Status {
    fn declare() -> EntityDecl {
        EntityDecl::new("Status", "/vmi")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("code", Kind::String))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub title: String,
}

impl Entity for Group {
    fn declare() -> EntityDecl {
        EntityDecl::new("Group", "/vmi")
            .field(FieldDecl::new("id", Kind::String).primary_key().uuid())
            .field(FieldDecl::new("title", Kind::String))
    }
}

/// Keyed by a caller-chosen code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Code {
    pub code: String,
    pub label: String,
}

impl Entity for Code {
    fn declare() -> EntityDecl {
        EntityDecl::new("Code", "/vmi")
            .field(FieldDecl::new("code", Kind::String).primary_key())
            .field(FieldDecl::new("label", Kind::String))
    }
}

/// Owned singular status, referenced group collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub tags: Vec<String>,
    pub status: Option<Status>,
    pub groups: Vec<Group>,
}

impl Entity for Device {
    fn declare() -> EntityDecl {
        EntityDecl::new("Device", "/vmi")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("name", Kind::String))
            .field(FieldDecl::slice("tags", Kind::String))
            .field(FieldDecl::owned::<Status>("status"))
            .field(FieldDecl::references::<Group>("groups"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Part {
    pub id: i64,
    pub label: String,
}

impl Entity for Part {
    fn declare() -> EntityDecl {
        EntityDecl::new("Part", "/vmi")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("label", Kind::String))
    }
}

/// Owned part collection, referenced singular owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Machine {
    pub id: i64,
    pub name: String,
    pub parts: Vec<Part>,
    pub owner: Option<Group>,
}

impl Entity for Machine {
    fn declare() -> EntityDecl {
        EntityDecl::new("Machine", "/vmi")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("name", Kind::String))
            .field(FieldDecl::owned_many::<Part>("parts"))
            .field(FieldDecl::reference::<Group>("owner"))
    }
}

/// Self-referencing tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub children: Vec<Node>,
}

impl Entity for Node {
    fn declare() -> EntityDecl {
        EntityDecl::new("Node", "/vmi")
            .field(FieldDecl::new("id", Kind::Int64).primary_key().auto_increment())
            .field(FieldDecl::new("name", Kind::String))
            .field(FieldDecl::owned_many::<Node>("children"))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestContext {
    pub orm: Orm<SqliteBuilder, SqliteExecutor>,
    pub provider: LocalProvider,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(OrmConfig::default())
    }

    pub fn with_config(config: OrmConfig) -> Self {
        init_tracing();
        Self {
            orm: relmap_sqlite::open_in_memory(config).unwrap(),
            provider: LocalProvider::new(),
        }
    }

    pub fn create<T: Entity>(&mut self) {
        let model = self.provider.type_model::<T>().unwrap();
        self.orm.create_table(&model).unwrap();
    }

    pub fn insert<T: Entity>(&mut self, entity: &T) -> T {
        let mut model = self.provider.entity_model(entity).unwrap();
        self.orm.insert(&mut model).unwrap();
        self.provider.materialize(&model).unwrap()
    }

    pub fn update<T: Entity>(&mut self, entity: &T) -> T {
        let mut model = self.provider.entity_model(entity).unwrap();
        self.orm.update(&mut model).unwrap();
        self.provider.materialize(&model).unwrap()
    }

    pub fn delete<T: Entity>(&mut self, entity: &T) -> u64 {
        let model = self.provider.entity_model(entity).unwrap();
        self.orm.delete(&model).unwrap()
    }

    pub fn query<T: Entity>(&mut self, sample: &T) -> Result<T> {
        let model = self.provider.entity_model(sample)?;
        let found = self.orm.query(&model)?;
        self.provider.materialize(found.as_ref())
    }

    pub fn batch<T: Entity>(&mut self, filter: &Filter) -> Vec<T> {
        let model = self.provider.type_model::<T>().unwrap();
        self.orm
            .batch_query(&model, filter)
            .unwrap()
            .iter()
            .map(|m| self.provider.materialize(m.as_ref()).unwrap())
            .collect()
    }

    pub fn count<T: Entity>(&mut self) -> u64 {
        let model = self.provider.type_model::<T>().unwrap();
        self.orm.count(&model, &Filter::new()).unwrap()
    }

    /// Rows in a table, bypassing the engine.
    pub fn rows(&self, table: &str) -> i64 {
        self.orm
            .executor()
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
            .unwrap()
    }

    pub fn model<T: Entity>(&self, entity: &T) -> Box<dyn Model> {
        Box::new(self.provider.entity_model(entity).unwrap())
    }
}
