use std::collections::HashSet;

use tracing::debug;

use super::{field_of, Orm};
use crate::builder::Builder;
use crate::error::{Operation, Result, ResultExt};
use crate::executor::Executor;
use crate::model::{relation_fields, Model};
use crate::relation::classify_relation;

impl<B: Builder, E: Executor> Orm<B, E> {
    /// `visited` holds the type keys already handled in this call.
    pub(super) fn create_tables(&mut self, model: &dyn Model, visited: &mut HashSet<String>) -> Result<()> {
        if !visited.insert(model.key()) {
            return Ok(());
        }

        let table = self.builder.table_name(model);
        if !self.executor.check_table_exist(&table)? {
            debug!(model = %model.name(), table = %table, "create table");
            let statement = self.builder.build_create_table(model)?;
            self.execute(statement)?;
        }

        for name in relation_fields(model) {
            let field = field_of(model, &name)?;
            let related = model.related_model(&name)?;
            self.create_tables(related.as_ref(), visited)
                .within(Operation::CreateTable, Some(&name))?;

            let relation = self
                .builder
                .relation_table_name(model, field, related.as_ref())?;
            if !self.executor.check_table_exist(&relation)? {
                debug!(model = %model.name(), field = %name, table = %relation, "create relation table");
                let statement = self
                    .builder
                    .build_create_relation_table(model, field, related.as_ref())
                    .within(Operation::CreateTable, Some(&name))?;
                self.execute(statement)?;
            }
        }
        Ok(())
    }

    pub(super) fn drop_tables(&mut self, model: &dyn Model, visited: &mut HashSet<String>) -> Result<()> {
        if !visited.insert(model.key()) {
            return Ok(());
        }

        for name in relation_fields(model) {
            let field = field_of(model, &name)?;
            let related = model.related_model(&name)?;

            let relation = self
                .builder
                .relation_table_name(model, field, related.as_ref())?;
            if self.executor.check_table_exist(&relation)? {
                debug!(model = %model.name(), field = %name, table = %relation, "drop relation table");
                let statement = self
                    .builder
                    .build_drop_relation_table(model, field, related.as_ref())?;
                self.execute(statement)?;
            }

            if classify_relation(field)?.is_owned() {
                self.drop_tables(related.as_ref(), visited)
                    .within(Operation::DropTable, Some(&name))?;
            }
        }

        let table = self.builder.table_name(model);
        if self.executor.check_table_exist(&table)? {
            debug!(model = %model.name(), table = %table, "drop table");
            let statement = self.builder.build_drop_table(model)?;
            self.execute(statement)?;
        }
        Ok(())
    }
}
