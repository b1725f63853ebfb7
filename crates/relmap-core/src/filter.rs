//! Query filters.
//!
//! A [`Filter`] collects predicates on model fields plus ordering, paging
//! and an optional value mask. The engine fills it and statement builders
//! consume it; predicates name fields, never columns.

use relmap_proto::{Page, Predicate, SortSpec, Value};

use crate::model::{Model, View};

/// Conjunctive predicates, sort order, paging and value mask for a query.
#[derive(Debug, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
    sort: Vec<SortSpec>,
    page: Option<Page>,
    mask: Option<Box<dyn Model>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(Predicate::equal(field, value))
    }

    pub fn not_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(Predicate::not_equal(field, value))
    }

    pub fn below(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(Predicate::below(field, value))
    }

    pub fn above(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(Predicate::above(field, value))
    }

    pub fn in_values(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.predicate(Predicate::in_values(field, values))
    }

    pub fn not_in(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.predicate(Predicate::not_in(field, values))
    }

    pub fn like(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.predicate(Predicate::like(field, pattern))
    }

    /// Add a prebuilt predicate.
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a sort key. Keys apply in the order added.
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Limit the fetched columns and relations to the fields of `mask`.
    ///
    /// Typically a view-scoped copy of the queried model.
    pub fn value_mask(mut self, mask: Box<dyn Model>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn sort_keys(&self) -> &[SortSpec] {
        &self.sort
    }

    pub fn paging(&self) -> Option<Page> {
        self.page
    }

    pub fn mask(&self) -> Option<&dyn Model> {
        self.mask.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl Clone for Filter {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            sort: self.sort.clone(),
            page: self.page,
            mask: self.mask.as_ref().map(|m| m.copy(View::Origin)),
        }
    }
}
