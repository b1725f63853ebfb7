//! Persistence specifications attached to fields.

use relmap_proto::{Kind, ValueGeneration};

use super::types::TypeDesc;

/// Which subset of a model's fields a copy keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Every field.
    #[default]
    Origin,
    /// Fields flagged for the detail view.
    Detail,
    /// Fields flagged for the lite view.
    Lite,
}

/// Column mapping, key flag, value generation and view visibility of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    column: String,
    primary_key: bool,
    generation: ValueGeneration,
    detail: bool,
    lite: bool,
}

impl Spec {
    /// Spec for a plain column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            primary_key: false,
            generation: ValueGeneration::Customer,
            detail: false,
            lite: false,
        }
    }

    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn with_generation(mut self, generation: ValueGeneration) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_views(mut self, detail: bool, lite: bool) -> Self {
        self.detail = detail;
        self.lite = lite;
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn generation(&self) -> ValueGeneration {
        self.generation
    }

    pub fn in_detail(&self) -> bool {
        self.detail
    }

    pub fn in_lite(&self) -> bool {
        self.lite
    }

    /// Whether a field with this spec survives a copy in `view`.
    ///
    /// Primary keys are visible in every view.
    pub fn visible_in(&self, view: View) -> bool {
        self.primary_key
            || match view {
                View::Origin => true,
                View::Detail => self.detail,
                View::Lite => self.lite,
            }
    }

    /// Problems with this spec for a field of type `desc`, empty when valid.
    pub(crate) fn problems(&self, field: &str, desc: &TypeDesc) -> Vec<String> {
        let mut problems = Vec::new();
        if self.column.is_empty() {
            problems.push(format!("field '{field}' has an empty column name"));
        }
        if self.primary_key && (!desc.is_basic() || desc.is_slice()) {
            problems.push(format!(
                "primary key '{field}' must be a scalar, not {}",
                desc.kind()
            ));
        }

        let kind = desc.kind();
        let allowed = match self.generation {
            ValueGeneration::Customer => true,
            ValueGeneration::AutoIncrement => kind.is_integer(),
            ValueGeneration::Uuid => kind == Kind::String,
            ValueGeneration::Snowflake => kind == Kind::Int64,
            ValueGeneration::DateTime => kind == Kind::DateTime,
        };
        if !allowed {
            problems.push(format!(
                "field '{field}' of kind {kind} cannot use {:?} value generation",
                self.generation
            ));
        }
        if self.generation == ValueGeneration::AutoIncrement && !self.primary_key {
            problems.push(format!(
                "auto-increment field '{field}' must be the primary key"
            ));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems(spec: Spec, desc: TypeDesc) -> Vec<String> {
        spec.problems("f", &desc)
    }

    #[test]
    fn test_generation_kind_rules() {
        let auto = Spec::new("id")
            .with_primary_key(true)
            .with_generation(ValueGeneration::AutoIncrement);
        assert!(problems(auto.clone(), TypeDesc::basic(Kind::UInt32)).is_empty());
        assert_eq!(problems(auto.clone(), TypeDesc::basic(Kind::String)).len(), 1);
        assert_eq!(problems(auto, TypeDesc::basic(Kind::Float64)).len(), 1);

        let uuid = Spec::new("id").with_generation(ValueGeneration::Uuid);
        assert!(problems(uuid.clone(), TypeDesc::basic(Kind::String)).is_empty());
        assert_eq!(problems(uuid, TypeDesc::basic(Kind::Int64)).len(), 1);

        let snowflake = Spec::new("id").with_generation(ValueGeneration::Snowflake);
        assert!(problems(snowflake.clone(), TypeDesc::basic(Kind::Int64)).is_empty());
        assert_eq!(problems(snowflake, TypeDesc::basic(Kind::UInt64)).len(), 1);

        let stamp = Spec::new("at").with_generation(ValueGeneration::DateTime);
        assert!(problems(stamp.clone(), TypeDesc::basic(Kind::DateTime)).is_empty());
        assert_eq!(problems(stamp, TypeDesc::basic(Kind::String)).len(), 1);
    }

    #[test]
    fn test_primary_key_must_be_scalar() {
        let pk = Spec::new("status").with_primary_key(true);
        assert_eq!(
            problems(pk.clone(), TypeDesc::structure("Status", "/vmi")).len(),
            1
        );
        let tags = TypeDesc::slice(TypeDesc::basic(Kind::String)).unwrap();
        assert_eq!(problems(pk, tags).len(), 1);
    }

    #[test]
    fn test_view_visibility() {
        let plain = Spec::new("name");
        assert!(plain.visible_in(View::Origin));
        assert!(!plain.visible_in(View::Lite));

        let lite = Spec::new("name").with_views(true, true);
        assert!(lite.visible_in(View::Detail));
        assert!(lite.visible_in(View::Lite));

        let pk = Spec::new("id").with_primary_key(true);
        assert!(pk.visible_in(View::Lite));
    }
}
