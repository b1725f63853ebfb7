//! Relation classification and association table naming.

use std::fmt;

use crate::error::{Error, Result};
use crate::model::{Field, Model};

/// Ownership and cardinality of a relation field.
///
/// Derived from the field's type descriptor: pointer fields are references,
/// slice fields are collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Related row is created and deleted with the host.
    OwnedSingular,
    /// Related rows are created and deleted with the host.
    OwnedCollection,
    /// Only the association follows the host.
    ReferencedSingular,
    /// Only the associations follow the host.
    ReferencedCollection,
}

impl RelationKind {
    pub fn from_flags(pointer: bool, slice: bool) -> Self {
        match (pointer, slice) {
            (false, false) => RelationKind::OwnedSingular,
            (false, true) => RelationKind::OwnedCollection,
            (true, false) => RelationKind::ReferencedSingular,
            (true, true) => RelationKind::ReferencedCollection,
        }
    }

    /// Numeric code used in association table names.
    pub fn code(self) -> u8 {
        match self {
            RelationKind::OwnedSingular => 1,
            RelationKind::OwnedCollection => 2,
            RelationKind::ReferencedSingular => 3,
            RelationKind::ReferencedCollection => 4,
        }
    }

    pub fn is_owned(self) -> bool {
        matches!(
            self,
            RelationKind::OwnedSingular | RelationKind::OwnedCollection
        )
    }

    pub fn is_collection(self) -> bool {
        matches!(
            self,
            RelationKind::OwnedCollection | RelationKind::ReferencedCollection
        )
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelationKind::OwnedSingular => "owned singular",
            RelationKind::OwnedCollection => "owned collection",
            RelationKind::ReferencedSingular => "referenced singular",
            RelationKind::ReferencedCollection => "referenced collection",
        })
    }
}

/// Classify a relation field. Basic fields are not relations.
pub fn classify_relation(field: &dyn Field) -> Result<RelationKind> {
    let desc = field.type_desc();
    if desc.is_basic() {
        return Err(Error::classification(field.name(), "is not a relation field"));
    }
    Ok(RelationKind::from_flags(desc.is_pointer(), desc.is_slice()))
}

/// Upper-case the first character of each `_`/`-` separated segment.
fn camel(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Host table name: namespace prefix plus the capitalized type name.
pub fn entity_table_name(model: &dyn Model, prefix: &str) -> String {
    format!("{prefix}{}", camel(model.name()))
}

/// Association table name for `field` of `host` relating to `related`.
///
/// The relation kind code keeps the four kinds apart for identical
/// host/field/related triples.
pub fn relation_table_name(
    host: &dyn Model,
    field: &dyn Field,
    related: &dyn Model,
    prefix: &str,
) -> Result<String> {
    let kind = classify_relation(field)?;
    Ok(format!(
        "{prefix}{}{}{}{}",
        camel(host.name()),
        camel(field.name()),
        kind.code(),
        camel(related.name())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_flags() {
        assert_eq!(RelationKind::from_flags(false, false), RelationKind::OwnedSingular);
        assert_eq!(RelationKind::from_flags(false, true), RelationKind::OwnedCollection);
        assert_eq!(RelationKind::from_flags(true, false), RelationKind::ReferencedSingular);
        assert_eq!(RelationKind::from_flags(true, true), RelationKind::ReferencedCollection);

        assert!(RelationKind::OwnedCollection.is_owned());
        assert!(RelationKind::OwnedCollection.is_collection());
        assert!(!RelationKind::ReferencedSingular.is_owned());
        assert!(!RelationKind::ReferencedSingular.is_collection());
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes: std::collections::HashSet<u8> = [
            RelationKind::OwnedSingular,
            RelationKind::OwnedCollection,
            RelationKind::ReferencedSingular,
            RelationKind::ReferencedCollection,
        ]
        .iter()
        .map(|k| k.code())
        .collect();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_camel() {
        assert_eq!(camel("status"), "Status");
        assert_eq!(camel("sub_units"), "SubUnits");
        assert_eq!(camel("Unit"), "Unit");
        assert_eq!(camel("__x"), "X");
    }
}
