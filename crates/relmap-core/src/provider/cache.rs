//! Shape cache for model derivation.
//!
//! Declaring and validating an entity type happens once per distinct type
//! key; later derivations reuse the cached [`Shape`].

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Result;
use crate::model::{EntityDecl, Shape};

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    /// Get miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }
}

/// Concurrency-safe map from type key to validated shape.
///
/// When several callers derive the same type at once, the first insert
/// wins and the others adopt it.
#[derive(Debug, Default)]
pub struct ShapeCache {
    shapes: DashMap<String, Arc<Shape>>,
    stats: CacheStats,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the shape declared by `declare`, validating it on first use.
    pub fn resolve(&self, declare: fn() -> EntityDecl) -> Result<Arc<Shape>> {
        let decl = declare();
        let key = decl.key();
        if let Some(shape) = self.shapes.get(&key) {
            self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
            return Ok(Arc::clone(shape.value()));
        }

        self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
        let shape = Arc::new(Shape::from_decl(decl)?);
        tracing::debug!(shape = %key, fields = shape.fields().len(), "derived shape");
        Ok(Arc::clone(self.shapes.entry(key).or_insert(shape).value()))
    }

    pub fn get(&self, key: &str) -> Option<Arc<Shape>> {
        self.shapes.get(key).map(|s| Arc::clone(s.value()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shapes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Drop every cached shape. Models already derived keep theirs.
    pub fn clear(&self) {
        self.shapes.clear();
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
