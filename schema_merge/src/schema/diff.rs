//! Schema difference calculator
//!
//! Compares a desired (source) schema against the current (target) one and plans the
//! ordered list of [`ScriptAction`]s that turns the target into the source. Phases run in
//! a fixed order and each one can see what the earlier phases planned:
//!
//! 1. alter columns, 2. alter indexes,
//! 3. add tables, 4. add columns, 5. add indexes, 6. add check constraints,
//! 7. add foreign keys,
//! 8. drop tables, 9. drop columns, 10. drop indexes, 11. drop check constraints,
//! 12. drop foreign keys.
//!
//! Index and foreign key drops rely on that order: they skip objects an earlier drop
//! already removed as a dependency.

use crate::error::Result;
use crate::schema::action::{ActionKind, ScriptAction};
use crate::schema::generator::ScriptBuilder;
use crate::schema::types::{names_match, DbObject, DbObjectType, Schema, Table};
use crate::utils::naming::format_thousands;

impl Schema {
    /// Plan the actions that make `target` match `self`.
    ///
    /// Inspects the live target through `builder` (once) and links parent references on
    /// both schemas before planning.
    pub async fn compare<B>(
        &mut self,
        target: &mut Schema,
        builder: &mut B,
        debug: bool,
    ) -> Result<Vec<ScriptAction>>
    where
        B: ScriptBuilder + ?Sized,
    {
        builder.inspect_target_database().await?;

        self.link_parents();
        target.link_parents();

        plan(self, target, builder, debug)
    }

    /// Plan the full creation script, i.e. compare against an empty schema
    pub async fn create<B>(&mut self, builder: &mut B, debug: bool) -> Result<Vec<ScriptAction>>
    where
        B: ScriptBuilder + ?Sized,
    {
        let mut empty = Schema::new();
        self.compare(&mut empty, builder, debug).await
    }
}

impl Table {
    /// Compare a single table against its current version
    pub async fn compare<B>(
        &self,
        target: &Table,
        builder: &mut B,
        debug: bool,
    ) -> Result<Vec<ScriptAction>>
    where
        B: ScriptBuilder + ?Sized,
    {
        let mut source = Schema::new().with_table(self.clone());
        let mut target = Schema::new().with_table(target.clone());
        source.compare(&mut target, builder, debug).await
    }
}

/// Plan actions for two already-linked schemas against the builder's metadata snapshot
pub fn plan<B>(source: &Schema, target: &Schema, builder: &B, debug: bool) -> Result<Vec<ScriptAction>>
where
    B: ScriptBuilder + ?Sized,
{
    let mut planner = Planner {
        source,
        target,
        builder,
        debug,
        actions: Vec::new(),
    };

    planner.alter_columns()?;
    planner.alter_indexes()?;
    planner.add_tables()?;
    planner.add_columns()?;
    planner.add_indexes()?;
    planner.add_check_constraints()?;
    planner.add_foreign_keys()?;
    planner.drop_tables()?;
    planner.drop_columns()?;
    planner.drop_indexes()?;
    planner.drop_check_constraints()?;
    planner.drop_foreign_keys()?;

    let destructive = planner.actions.iter().filter(|a| a.is_destructive).count();
    tracing::info!(
        actions = planner.actions.len(),
        destructive,
        "Schema comparison complete"
    );

    Ok(planner.actions)
}

struct Planner<'a, B: ScriptBuilder + ?Sized> {
    source: &'a Schema,
    target: &'a Schema,
    builder: &'a B,
    debug: bool,
    actions: Vec<ScriptAction>,
}

impl<'a, B: ScriptBuilder + ?Sized> Planner<'a, B> {
    /// Tables present on both sides, paired by identity
    fn common_tables(&self) -> Vec<(&'a Table, &'a Table)> {
        self.source
            .tables
            .iter()
            .filter_map(|src| {
                self.target
                    .tables
                    .iter()
                    .find(|tgt| *tgt == src)
                    .map(|tgt| (src, tgt))
            })
            .collect()
    }

    /// Build an action, scripting it against the target schema and what is planned so far
    fn action(
        &self,
        kind: ActionKind,
        owner: Option<&Table>,
        object: DbObject,
    ) -> Result<ScriptAction> {
        let statements = self.builder.get_script(
            kind,
            self.target,
            owner,
            &object,
            &self.actions,
            self.debug,
        )?;

        let mut action = ScriptAction::new(kind, object);
        action.statements = statements;
        Ok(action)
    }

    fn push(&mut self, phase: &str, planned: Vec<ScriptAction>) {
        tracing::debug!(phase, actions = planned.len(), "Planned phase");
        for action in &planned {
            if action.is_destructive {
                tracing::warn!(
                    action = %action,
                    message = action.message.as_deref().unwrap_or_default(),
                    "Destructive action planned"
                );
            }
        }
        self.actions.extend(planned);
    }

    /// Whether an earlier drop action already removed this object as a dependency
    fn already_dropped(&self, object_type: DbObjectType, name: &str, kinds: &[ActionKind]) -> bool {
        self.actions
            .iter()
            .filter(|action| kinds.contains(&action.kind))
            .any(|action| action.affects(object_type, name))
    }

    fn is_dropping_table(&self, name: &str) -> bool {
        self.actions.iter().any(|action| {
            action.kind == ActionKind::Drop
                && action.object.object_type() == DbObjectType::Table
                && names_match(action.object.name(), name)
        })
    }

    fn is_creating_table(&self, name: &str) -> bool {
        self.actions.iter().any(|action| {
            action.kind == ActionKind::Create
                && action.object.object_type() == DbObjectType::Table
                && names_match(action.object.name(), name)
        })
    }

    /// Column alters on one table share their dependents: each dependent is dropped by
    /// the first alter that needs it and recreated by the last one.
    fn alter_columns(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            let mut altered = Vec::new();
            for column in &src.columns {
                let Some(current) = tgt.columns.iter().find(|col| *col == column) else {
                    continue;
                };
                if let Some(reason) = column.is_altered(current) {
                    let object = DbObject::from(column.clone());
                    let dependencies = object.dependencies(Some(src), self.target, &self.actions);
                    altered.push((object, reason, dependencies));
                }
            }

            for (i, (object, reason, dependencies)) in altered.iter().enumerate() {
                let needed_by = |dependent: &DbObject| -> Vec<usize> {
                    altered
                        .iter()
                        .enumerate()
                        .filter(|(_, (_, _, deps))| deps.iter().any(|(_, dep)| dep == dependent))
                        .map(|(j, _)| j)
                        .collect()
                };
                let drops: Vec<_> = dependencies
                    .iter()
                    .filter(|(_, dep)| needed_by(dep).first() == Some(&i))
                    .cloned()
                    .collect();
                let creates: Vec<_> = dependencies
                    .iter()
                    .filter(|(_, dep)| needed_by(dep).last() == Some(&i))
                    .cloned()
                    .collect();

                let mut action = ScriptAction::new(ActionKind::Alter, object.clone());
                action.statements = self.builder.wrap_script(
                    ActionKind::Alter,
                    Some(src),
                    object,
                    &drops,
                    &creates,
                    self.debug,
                )?;
                action.message = Some(reason.clone());
                planned.push(action);
            }
        }
        self.push("alter columns", planned);
        Ok(())
    }

    fn alter_indexes(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            for index in &src.indexes {
                let Some(current) = tgt.indexes.iter().find(|ndx| *ndx == index) else {
                    continue;
                };
                if let Some(reason) = index.is_altered(current) {
                    let mut action =
                        self.action(ActionKind::Alter, Some(src), index.clone().into())?;
                    action.message = Some(reason);
                    planned.push(action);
                }
            }
        }
        self.push("alter indexes", planned);
        Ok(())
    }

    fn add_tables(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for table in &self.source.tables {
            if !self.target.tables.contains(table) {
                planned.push(self.action(ActionKind::Create, None, table.clone().into())?);
            }
        }
        self.push("add tables", planned);
        Ok(())
    }

    fn add_columns(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            let rows = self.builder.metadata().row_count(&tgt.name);

            for column in &src.columns {
                if tgt.columns.contains(column) {
                    continue;
                }

                let mut column = column.clone();
                let needs_default = !column.is_nullable
                    && !column.is_calculated
                    && column.default_value.is_none()
                    && !src.is_identity_column(&column.name)
                    && rows > 0;
                column.is_default_required = needs_default;

                let mut action = self.action(ActionKind::Create, Some(src), column.clone().into())?;
                if needs_default {
                    action.message = Some(format!(
                        "Column {} requires a default value, {} has {} rows",
                        column.name,
                        tgt.name,
                        format_thousands(rows)
                    ));
                }
                planned.push(action);
            }
        }
        self.push("add columns", planned);
        Ok(())
    }

    fn add_indexes(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            for index in &src.indexes {
                if !tgt.indexes.contains(index) {
                    planned.push(self.action(ActionKind::Create, Some(src), index.clone().into())?);
                }
            }
        }
        self.push("add indexes", planned);
        Ok(())
    }

    fn add_check_constraints(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            for check in &src.check_constraints {
                if !tgt.check_constraints.contains(check) {
                    planned.push(self.action(ActionKind::Create, Some(src), check.clone().into())?);
                }
            }
        }
        self.push("add check constraints", planned);
        Ok(())
    }

    fn add_foreign_keys(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for fk in &self.source.foreign_keys {
            if self.target.foreign_keys.contains(fk) {
                continue;
            }

            let referenced_available = self.is_creating_table(&fk.referenced_table)
                || self.builder.metadata().has_table(&fk.referenced_table);
            if !referenced_available {
                tracing::warn!(
                    foreign_key = %fk.name,
                    referenced_table = %fk.referenced_table,
                    "Skipping foreign key until its referenced table exists"
                );
                continue;
            }

            let owner = self.source.table(&fk.parent);
            planned.push(self.action(ActionKind::Create, owner, fk.clone().into())?);
        }
        self.push("add foreign keys", planned);
        Ok(())
    }

    fn drop_tables(&mut self) -> Result<()> {
        // each drop sees the drops planned before it, so keys between two dropped
        // tables are not scripted separately
        let (source, target) = (self.source, self.target);
        for table in &target.tables {
            if source.tables.contains(table) || !self.builder.metadata().has_table(&table.name) {
                continue;
            }

            let metadata = self.builder.metadata();
            let is_destructive = metadata.row_count(&table.name) > 0;
            let message = metadata.drop_warning(&table.name);

            let mut action = self.action(ActionKind::Drop, None, table.clone().into())?;
            action.is_destructive = is_destructive;
            action.message = message;
            self.push("drop tables", vec![action]);
        }
        Ok(())
    }

    fn drop_columns(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            let metadata = self.builder.metadata();
            let is_destructive = metadata.row_count(&tgt.name) > 0;
            let message = metadata.drop_warning(&tgt.name);

            for column in &tgt.columns {
                if src.columns.contains(column) {
                    continue;
                }
                let mut action = self.action(ActionKind::Drop, Some(tgt), column.clone().into())?;
                action.is_destructive = is_destructive;
                action.message = message.clone();
                planned.push(action);
            }
        }
        self.push("drop columns", planned);
        Ok(())
    }

    fn drop_indexes(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            for index in &tgt.indexes {
                if src.indexes.contains(index)
                    || self.already_dropped(
                        DbObjectType::Index,
                        &index.name,
                        &[ActionKind::Drop, ActionKind::Alter],
                    )
                    || !self.builder.metadata().has_index(&index.name)
                {
                    continue;
                }
                planned.push(self.action(ActionKind::Drop, Some(tgt), index.clone().into())?);
            }
        }
        self.push("drop indexes", planned);
        Ok(())
    }

    fn drop_check_constraints(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for (src, tgt) in self.common_tables() {
            for check in &tgt.check_constraints {
                if !src.check_constraints.contains(check) {
                    planned.push(self.action(ActionKind::Drop, Some(tgt), check.clone().into())?);
                }
            }
        }
        self.push("drop check constraints", planned);
        Ok(())
    }

    fn drop_foreign_keys(&mut self) -> Result<()> {
        let mut planned = Vec::new();
        for fk in &self.target.foreign_keys {
            if self.source.foreign_keys.contains(fk)
                || self.is_dropping_table(&fk.parent)
                || self.already_dropped(DbObjectType::ForeignKey, &fk.name, &[ActionKind::Drop])
                || !self.builder.metadata().has_foreign_key(&fk.name)
            {
                continue;
            }

            let owner = self.target.table(&fk.parent);
            planned.push(self.action(ActionKind::Drop, owner, fk.clone().into())?);
        }
        self.push("drop foreign keys", planned);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::action::ScriptActions;
    use crate::schema::generator::DatabaseMetadata;
    use crate::schema::sqlserver::SqlServerScriptBuilder;
    use crate::schema::types::{Column, ForeignKey, Index, IndexType};
    use pretty_assertions::assert_eq;

    fn builder(indexes: &[&str], foreign_keys: &[&str]) -> SqlServerScriptBuilder {
        let mut metadata = DatabaseMetadata::default();
        metadata.schemas.insert("dbo".to_string());
        metadata.table_names.insert("dbo.Item".to_string());
        metadata.table_names.insert("dbo.Bin".to_string());
        metadata.index_names.extend(indexes.iter().map(|s| s.to_string()));
        metadata.foreign_key_names.extend(foreign_keys.iter().map(|s| s.to_string()));
        SqlServerScriptBuilder::with_metadata(metadata)
    }

    fn item(indexes: &[Index]) -> Table {
        let mut table = Table::new("dbo.Item")
            .with_column(Column::new("Id", "int"))
            .with_column(Column::new("Sku", "nvarchar(20)"))
            .with_column(Column::new("BinId", "int"));
        table.indexes = indexes.to_vec();
        table
    }

    fn bin() -> Table {
        Table::new("dbo.Bin")
            .with_column(Column::new("Id", "int"))
            .with_index(Index::new("PK_Bin", IndexType::PrimaryKey, &["Id"]))
    }

    #[tokio::test]
    async fn table_compare_reports_changed_index_columns() {
        let desired = item(&[Index::new("IX_Item_Sku", IndexType::NonUnique, &["Sku", "BinId"])]);
        let current = item(&[Index::new("IX_Item_Sku", IndexType::NonUnique, &["Sku"])]);
        let mut builder = builder(&["IX_Item_Sku"], &[]);

        let actions = desired.compare(&current, &mut builder, false).await.unwrap();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].message.as_deref(), Some("Added columns BinId"));
        assert_eq!(
            actions.to_sql_statements(&builder, false),
            vec![
                "DROP INDEX [IX_Item_Sku] ON [dbo].[Item]",
                "CREATE INDEX [IX_Item_Sku] ON [dbo].[Item] ([Sku] ASC, [BinId] ASC)",
            ]
        );
    }

    #[tokio::test]
    async fn drops_only_indexes_and_keys_the_target_has() {
        let source = Schema::new().with_table(item(&[])).with_table(bin());
        let target = Schema::new()
            .with_table(item(&[
                Index::new("IX_Item_Sku", IndexType::NonUnique, &["Sku"]),
                Index::new("IX_Item_Ghost", IndexType::NonUnique, &["BinId"]),
            ]))
            .with_table(bin())
            .with_foreign_key(ForeignKey::new("FK_Item_Bin", "dbo.Item", "dbo.Bin").with_column("BinId", "Id"))
            .with_foreign_key(ForeignKey::new("FK_Item_Gone", "dbo.Item", "dbo.Bin").with_column("BinId", "Id"));
        let mut builder = builder(&["IX_Item_Sku", "PK_Bin"], &["FK_Item_Bin"]);

        let mut source = source;
        let mut target = target;
        let actions = source.compare(&mut target, &mut builder, false).await.unwrap();

        assert_eq!(
            actions.to_compact_statements(),
            vec!["Drop Index dbo.Item.IX_Item_Sku", "Drop ForeignKey FK_Item_Bin"]
        );
        assert!(actions.iter().all(|a| !a.is_destructive));
    }

    #[tokio::test]
    async fn create_scripts_everything_against_an_empty_target() {
        let mut schema = Schema::new()
            .with_table(bin())
            .with_table(item(&[]))
            .with_foreign_key(ForeignKey::new("FK_Item_Bin", "dbo.Item", "dbo.Bin").with_column("BinId", "Id"));
        let mut builder = SqlServerScriptBuilder::with_metadata(DatabaseMetadata::default());

        let actions = schema.create(&mut builder, false).await.unwrap();

        assert_eq!(
            actions.to_compact_statements(),
            vec![
                "Create Table dbo.Bin",
                "Create Table dbo.Item",
                "Create ForeignKey FK_Item_Bin"
            ]
        );
    }

    #[tokio::test]
    async fn debug_plans_carry_action_comments() {
        let mut source = Schema::new().with_table(bin());
        let mut target = Schema::new()
            .with_table(bin())
            .with_table(Table::new("dbo.Item").with_column(Column::new("Id", "int")));
        let mut builder = builder(&[], &[]);

        let actions = source.compare(&mut target, &mut builder, true).await.unwrap();

        assert_eq!(
            actions.to_sql_statements(&builder, true),
            vec!["-- Drop Table dbo.Item", "DROP TABLE [dbo].[Item]"]
        );
    }
}
