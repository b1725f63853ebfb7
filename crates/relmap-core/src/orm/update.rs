use std::collections::HashSet;

use super::{primary_key, Orm};
use crate::builder::Builder;
use crate::error::{Operation, Result, ResultExt};
use crate::executor::Executor;
use crate::model::{relation_fields, Model};

impl<B: Builder, E: Executor> Orm<B, E> {
    pub(super) fn update_model(&mut self, model: &mut dyn Model) -> Result<()> {
        let key = primary_key(model)?;

        let statement = self.builder.build_update(model)?;
        self.execute(statement)?;

        // The host itself must survive cascades through cyclic ownership.
        let mut visited = HashSet::new();
        visited.insert(format!("{}#{key:?}", model.key()));

        for name in relation_fields(model) {
            self.replace_relation(model, &name, &mut visited)
                .within(Operation::Update, Some(&name))?;
        }
        Ok(())
    }

    /// Clear the relation's current contents, then link the new value.
    fn replace_relation(
        &mut self,
        host: &mut dyn Model,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        self.clear_relation(&*host, name, visited, 0)?;
        self.insert_relation_field(host, name, Operation::Update)
    }
}
