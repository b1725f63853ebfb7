//! Model provider.
//!
//! The provider derives models from entity values and materializes models
//! back into entity values. It owns the [`ShapeCache`] every model it
//! derives shares; clones of a provider share the same cache.

mod cache;

use std::sync::Arc;

pub use cache::{CacheStats, ShapeCache};

use crate::error::{Error, Result};
use crate::model::{to_json, Entity, LocalModel, Model, Shape};

/// Derives instance-bound models and materializes any model.
#[derive(Debug, Clone, Default)]
pub struct LocalProvider {
    cache: Arc<ShapeCache>,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider over an existing cache.
    pub fn with_cache(cache: Arc<ShapeCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ShapeCache> {
        &self.cache
    }

    /// Validate and cache the shape of `T`.
    pub fn register<T: Entity>(&self) -> Result<Arc<Shape>> {
        self.cache.resolve(T::declare)
    }

    /// Model carrying the values of `entity`.
    pub fn entity_model<T: Entity>(&self, entity: &T) -> Result<LocalModel> {
        LocalModel::bind(Arc::clone(&self.cache), entity)
    }

    /// Model of `T::default()`.
    pub fn type_model<T: Entity>(&self) -> Result<LocalModel> {
        self.entity_model(&T::default())
    }

    /// Native value of any model whose type is `T`.
    pub fn materialize<T: Entity>(&self, model: &dyn Model) -> Result<T> {
        let expected = T::declare().key();
        if model.key() != expected {
            return Err(Error::Conversion(format!(
                "model '{}' cannot materialize as '{expected}'",
                model.key()
            )));
        }
        Ok(serde_json::from_value(to_json(model)?)?)
    }
}
