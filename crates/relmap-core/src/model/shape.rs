//! Validated entity shapes.

use std::collections::HashSet;

use super::entity::{EntityDecl, RelatedDecl};
use super::spec::Spec;
use super::types::TypeDesc;
use crate::error::{Error, Result};

/// Identifiers that cannot be used as field or column names.
const RESERVED: &[&str] = &[
    "select", "insert", "update", "delete", "from", "where", "table", "create", "drop", "alter",
    "index", "primary", "references", "join", "group", "order", "having", "limit", "offset",
    "values", "into", "set", "and", "or", "not", "null", "union",
];

/// Presentation metadata of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    pub id: Option<i64>,
    pub show_name: Option<String>,
    pub icon: Option<String>,
}

/// One validated field declaration.
#[derive(Debug, Clone)]
pub struct FieldShape {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) type_desc: TypeDesc,
    pub(crate) spec: Spec,
    pub(crate) related: Option<RelatedDecl>,
}

impl FieldShape {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_desc(&self) -> &TypeDesc {
        &self.type_desc
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }
}

/// A validated entity type: identity plus ordered field declarations.
#[derive(Debug, Clone)]
pub struct Shape {
    pub(crate) name: String,
    pub(crate) pkg_key: String,
    pub(crate) description: String,
    pub(crate) presentation: Presentation,
    pub(crate) fields: Vec<FieldShape>,
    pub(crate) primary: usize,
}

impl Shape {
    /// Validate a declaration.
    ///
    /// Every problem found is collected into one [`Error::Shape`].
    pub fn from_decl(decl: EntityDecl) -> Result<Self> {
        let mut problems = Vec::new();
        let mut fields = Vec::with_capacity(decl.fields.len());

        for field in &decl.fields {
            match field.type_desc() {
                Ok(type_desc) => fields.push(FieldShape {
                    name: field.name.clone(),
                    description: field.description.clone(),
                    type_desc,
                    spec: field.spec(),
                    related: field.related(),
                }),
                Err(e) => problems.push(format!("field '{}': {e}", field.name)),
            }
        }

        let primary = collect_problems(
            &mut problems,
            fields.iter().map(|f| (f.name.as_str(), &f.type_desc, &f.spec)),
        );
        if decl.fields.is_empty() {
            problems.push("no persistable fields".to_string());
        }

        match primary {
            Some(primary) if problems.is_empty() => Ok(Self {
                name: decl.name,
                pkg_key: decl.pkg_key,
                description: decl.description,
                presentation: decl.presentation,
                fields,
                primary,
            }),
            _ => Err(Error::Shape {
                shape: decl.name,
                problems,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pkg_key(&self) -> &str {
        &self.pkg_key
    }

    /// Type key, `pkg_key/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.pkg_key, self.name)
    }

    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_field(&self) -> &FieldShape {
        &self.fields[self.primary]
    }
}

/// Check field names, types and specs, appending problems.
///
/// Returns the index of the single primary key, if there is exactly one.
pub(crate) fn collect_problems<'a>(
    problems: &mut Vec<String>,
    fields: impl IntoIterator<Item = (&'a str, &'a TypeDesc, &'a Spec)>,
) -> Option<usize> {
    let mut names = HashSet::new();
    let mut columns = HashSet::new();
    let mut keys = Vec::new();

    for (index, (name, desc, spec)) in fields.into_iter().enumerate() {
        if name.is_empty() {
            problems.push(format!("field #{index} has no name"));
        }
        if !names.insert(name) {
            problems.push(format!("duplicate field '{name}'"));
        }
        if desc.is_basic() && !columns.insert(spec.column()) {
            problems.push(format!("duplicate column '{}'", spec.column()));
        }
        let mut idents = vec![name];
        if spec.column() != name {
            idents.push(spec.column());
        }
        for ident in idents {
            if RESERVED.contains(&ident.to_ascii_lowercase().as_str()) {
                problems.push(format!("'{ident}' is a reserved identifier"));
            }
        }
        problems.extend(
            desc.problems()
                .into_iter()
                .map(|p| format!("field '{name}': {p}")),
        );
        problems.extend(spec.problems(name, desc));
        if spec.is_primary_key() {
            keys.push(index);
        }
    }

    match keys.as_slice() {
        [only] => Some(*only),
        [] => {
            problems.push("no primary key".to_string());
            None
        }
        many => {
            problems.push(format!("{} primary keys, expected one", many.len()));
            None
        }
    }
}
