//! Script generation
//!
//! [`ScriptBuilder`] is the contract a SQL dialect implements: one method per DDL kind,
//! plus the live [`DatabaseMetadata`] snapshot used to decide what actually exists on the
//! target. The provided [`ScriptBuilder::get_script`] wraps an object's own statements
//! with the drops (and, for alters, recreates) of its dependents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::action::{ActionKind, ScriptAction, Statement};
use crate::schema::dependency::Dependency;
use crate::schema::types::{
    names_match, CheckConstraint, Column, DbObject, ForeignKey, Index, Schema, Table,
};
use crate::utils::naming::format_thousands;

/// Read-only snapshot of what exists on the live target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseMetadata {
    pub schemas: BTreeSet<String>,
    /// Schema-qualified table names
    pub table_names: BTreeSet<String>,
    pub foreign_key_names: BTreeSet<String>,
    pub index_names: BTreeSet<String>,
    pub row_counts: BTreeMap<String, i64>,
}

fn contains_name(names: &BTreeSet<String>, name: &str) -> bool {
    names.contains(name) || names.iter().any(|n| names_match(n, name))
}

impl DatabaseMetadata {
    pub fn has_schema(&self, name: &str) -> bool {
        contains_name(&self.schemas, name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        contains_name(&self.table_names, name)
    }

    pub fn has_foreign_key(&self, name: &str) -> bool {
        contains_name(&self.foreign_key_names, name)
    }

    pub fn has_index(&self, name: &str) -> bool {
        contains_name(&self.index_names, name)
    }

    /// Live row count of a table, zero when unknown
    pub fn row_count(&self, table: &str) -> i64 {
        self.row_counts
            .get(table)
            .or_else(|| {
                self.row_counts
                    .iter()
                    .find(|(name, _)| names_match(name, table))
                    .map(|(_, count)| count)
            })
            .copied()
            .unwrap_or(0)
    }

    /// Warning attached to drops that would delete rows
    pub fn drop_warning(&self, table: &str) -> Option<String> {
        match self.row_count(table) {
            rows if rows > 0 => Some(format!(
                "Caution! {} rows will be deleted",
                format_thousands(rows)
            )),
            _ => None,
        }
    }
}

fn require_parent<'a>(parent: Option<&'a Table>, object: &DbObject) -> Result<&'a Table> {
    parent.ok_or_else(|| Error::MissingParent(object.to_string()))
}

/// Statement builder for one SQL dialect
#[async_trait]
pub trait ScriptBuilder: Send + Sync {
    fn metadata(&self) -> &DatabaseMetadata;

    /// Inject a metadata snapshot; later inspection becomes a no-op
    fn set_metadata(&mut self, metadata: DatabaseMetadata);

    fn has_metadata(&self) -> bool;

    /// Query the live target for its metadata snapshot
    async fn fetch_metadata(&self) -> Result<DatabaseMetadata>;

    /// Populate the metadata snapshot once
    async fn inspect_target_database(&mut self) -> Result<()> {
        if self.has_metadata() {
            return Ok(());
        }

        let metadata = self.fetch_metadata().await?;
        tracing::debug!(
            tables = metadata.table_names.len(),
            foreign_keys = metadata.foreign_key_names.len(),
            indexes = metadata.index_names.len(),
            "Inspected target database"
        );
        self.set_metadata(metadata);
        Ok(())
    }

    fn create_table(&self, table: &Table) -> Result<Vec<Statement>>;
    fn drop_table(&self, table: &Table) -> Result<Vec<Statement>>;

    fn alter_table(&self, table: &Table) -> Result<Vec<Statement>> {
        Err(Error::Unsupported {
            action: ActionKind::Alter,
            object_type: table.object_type(),
        })
    }

    /// Inline column clause as used inside `CREATE TABLE`
    fn column_definition(&self, table: &Table, column: &Column) -> Result<String>;
    fn add_column(&self, table: &Table, column: &Column) -> Result<Vec<Statement>>;
    fn alter_column(&self, table: &Table, column: &Column) -> Result<Vec<Statement>>;
    fn drop_column(&self, table: &Table, column: &Column) -> Result<Vec<Statement>>;

    fn create_index(&self, table: &Table, index: &Index) -> Result<Vec<Statement>>;
    fn drop_index(&self, table: &Table, index: &Index) -> Result<Vec<Statement>>;

    fn alter_index(&self, table: &Table, index: &Index) -> Result<Vec<Statement>> {
        let mut statements = self.drop_index(table, index)?;
        statements.extend(self.create_index(table, index)?);
        Ok(statements)
    }

    fn create_foreign_key(&self, fk: &ForeignKey) -> Result<Vec<Statement>>;
    fn drop_foreign_key(&self, fk: &ForeignKey) -> Result<Vec<Statement>>;

    fn alter_foreign_key(&self, fk: &ForeignKey) -> Result<Vec<Statement>> {
        Err(Error::Unsupported {
            action: ActionKind::Alter,
            object_type: fk.object_type(),
        })
    }

    fn create_check_constraint(&self, table: &Table, check: &CheckConstraint) -> Result<Vec<Statement>>;
    fn drop_check_constraint(&self, table: &Table, check: &CheckConstraint) -> Result<Vec<Statement>>;

    fn alter_check_constraint(&self, table: &Table, check: &CheckConstraint) -> Result<Vec<Statement>> {
        let mut statements = self.drop_check_constraint(table, check)?;
        statements.extend(self.create_check_constraint(table, check)?);
        Ok(statements)
    }

    fn line_comment(&self, text: &str) -> String {
        format!("-- {}", text)
    }

    fn block_comment(&self, sql: &str) -> String {
        format!("/*\n{}\n*/", sql)
    }

    fn create_object(&self, parent: Option<&Table>, object: &DbObject) -> Result<Vec<Statement>> {
        match object {
            DbObject::Table(table) => self.create_table(table),
            DbObject::Column(col) => self.add_column(require_parent(parent, object)?, col),
            DbObject::Index(ndx) => self.create_index(require_parent(parent, object)?, ndx),
            DbObject::ForeignKey(fk) => self.create_foreign_key(fk),
            DbObject::CheckConstraint(chk) => {
                self.create_check_constraint(require_parent(parent, object)?, chk)
            }
        }
    }

    fn alter_object(&self, parent: Option<&Table>, object: &DbObject) -> Result<Vec<Statement>> {
        match object {
            DbObject::Table(table) => self.alter_table(table),
            DbObject::Column(col) => self.alter_column(require_parent(parent, object)?, col),
            DbObject::Index(ndx) => self.alter_index(require_parent(parent, object)?, ndx),
            DbObject::ForeignKey(fk) => self.alter_foreign_key(fk),
            DbObject::CheckConstraint(chk) => {
                self.alter_check_constraint(require_parent(parent, object)?, chk)
            }
        }
    }

    fn drop_object(&self, parent: Option<&Table>, object: &DbObject) -> Result<Vec<Statement>> {
        match object {
            DbObject::Table(table) => self.drop_table(table),
            DbObject::Column(col) => self.drop_column(require_parent(parent, object)?, col),
            DbObject::Index(ndx) => self.drop_index(require_parent(parent, object)?, ndx),
            DbObject::ForeignKey(fk) => self.drop_foreign_key(fk),
            DbObject::CheckConstraint(chk) => {
                self.drop_check_constraint(require_parent(parent, object)?, chk)
            }
        }
    }

    /// Whether the live target has the object; only tables, foreign keys and indexes are tracked
    fn target_object_exists(&self, object: &DbObject) -> Result<bool> {
        let metadata = self.metadata();
        match object {
            DbObject::Table(table) => Ok(metadata.has_table(&table.name)),
            DbObject::ForeignKey(fk) => Ok(metadata.has_foreign_key(&fk.name)),
            DbObject::Index(ndx) => Ok(metadata.has_index(&ndx.name)),
            other => Err(Error::UnsupportedObjectType(other.object_type())),
        }
    }

    /// Drop statements for the dependents the live target actually has
    fn drop_dependencies(&self, dependencies: &[Dependency<'_>]) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        for (parent, dependent) in dependencies {
            if self.target_object_exists(dependent)? {
                statements.extend(self.drop_object(*parent, dependent)?);
            }
        }
        Ok(statements)
    }

    fn create_dependencies(&self, dependencies: &[Dependency<'_>]) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        for (parent, dependent) in dependencies {
            statements.extend(self.create_object(*parent, dependent)?);
        }
        Ok(statements)
    }

    /// Statements for one action, wrapped with the drops and recreates its dependents need
    fn get_script(
        &self,
        kind: ActionKind,
        schema: &Schema,
        parent: Option<&Table>,
        object: &DbObject,
        in_flight: &[ScriptAction],
        debug: bool,
    ) -> Result<Vec<Statement>> {
        if kind == ActionKind::Create {
            return self.create_object(parent, object);
        }

        let dependencies = object.dependencies(parent, schema, in_flight);
        self.wrap_script(kind, parent, object, &dependencies, &dependencies, debug)
    }

    /// Alter or drop `object` between dropping `drops` and recreating `creates`.
    ///
    /// Recreates only apply to alters; a dropped object leaves its dependents dropped.
    fn wrap_script(
        &self,
        kind: ActionKind,
        parent: Option<&Table>,
        object: &DbObject,
        drops: &[Dependency<'_>],
        creates: &[Dependency<'_>],
        debug: bool,
    ) -> Result<Vec<Statement>> {
        let mut statements = self.drop_dependencies(drops)?;

        if debug {
            statements.push(Statement::bare(
                self.line_comment(&format!("{} {}", kind, object)),
            ));
        }

        match kind {
            ActionKind::Alter => {
                statements.extend(self.alter_object(parent, object)?);
                statements.extend(self.create_dependencies(creates)?);
            }
            ActionKind::Create => statements.extend(self.create_object(parent, object)?),
            ActionKind::Drop => statements.extend(self.drop_object(parent, object)?),
        }

        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::sqlserver::SqlServerScriptBuilder;
    use crate::schema::types::IndexType;
    use pretty_assertions::assert_eq;

    fn metadata() -> DatabaseMetadata {
        DatabaseMetadata {
            schemas: ["dbo".to_string()].into(),
            table_names: ["dbo.Whatever".to_string()].into(),
            index_names: ["IX_Whatever_Column1".to_string()].into(),
            row_counts: [("dbo.Whatever".to_string(), 12_345)].into(),
            ..Default::default()
        }
    }

    #[test]
    fn metadata_lookups_ignore_case() {
        let metadata = metadata();
        assert!(metadata.has_table("DBO.WHATEVER"));
        assert!(metadata.has_index("ix_whatever_column1"));
        assert!(!metadata.has_foreign_key("FK_Anything"));
        assert_eq!(metadata.row_count("dbo.whatever"), 12_345);
        assert_eq!(metadata.row_count("dbo.Missing"), 0);
    }

    #[test]
    fn drop_warning_reports_formatted_row_count() {
        let metadata = metadata();
        assert_eq!(
            metadata.drop_warning("dbo.Whatever").as_deref(),
            Some("Caution! 12,345 rows will be deleted")
        );
        assert_eq!(metadata.drop_warning("dbo.Empty"), None);
    }

    #[test]
    fn existence_check_rejects_untracked_kinds() {
        let builder = SqlServerScriptBuilder::with_metadata(metadata());
        let column = DbObject::Column(Column::new("Column1", "int"));
        assert!(matches!(
            builder.target_object_exists(&column),
            Err(Error::UnsupportedObjectType(_))
        ));
    }

    #[test]
    fn altering_a_table_is_unsupported() {
        let builder = SqlServerScriptBuilder::with_metadata(metadata());
        let table = DbObject::Table(Table::new("dbo.Whatever"));
        let result = builder.get_script(ActionKind::Alter, &Schema::new(), None, &table, &[], false);
        assert!(matches!(result, Err(Error::Unsupported { action: ActionKind::Alter, .. })));
    }

    #[test]
    fn child_objects_require_a_parent() {
        let builder = SqlServerScriptBuilder::with_metadata(metadata());
        let index = DbObject::Index(Index::new("IX_X", IndexType::NonUnique, &["A"]));
        assert!(matches!(builder.create_object(None, &index), Err(Error::MissingParent(_))));
    }

    #[test]
    fn debug_comment_sits_between_dependency_drops_and_own_statements() {
        let builder = SqlServerScriptBuilder::with_metadata(metadata());
        let table = Table::new("dbo.Whatever")
            .with_column(Column::new("Column1", "nvarchar(50)"))
            .with_index(Index::new("IX_Whatever_Column1", IndexType::NonUnique, &["Column1"]));
        let mut schema = Schema::new().with_table(table);
        schema.link_parents();
        let table = &schema.tables[0];
        let column = DbObject::Column(table.columns[0].clone());

        let sql: Vec<String> = builder
            .get_script(ActionKind::Alter, &schema, Some(table), &column, &[], true)
            .unwrap()
            .into_iter()
            .map(|st| st.sql)
            .collect();

        assert_eq!(
            sql,
            vec![
                "DROP INDEX [IX_Whatever_Column1] ON [dbo].[Whatever]",
                "-- Alter Column dbo.Whatever.Column1",
                "ALTER TABLE [dbo].[Whatever] ALTER COLUMN [Column1] nvarchar(50) NOT NULL",
                "CREATE INDEX [IX_Whatever_Column1] ON [dbo].[Whatever] ([Column1] ASC)",
            ]
        );
    }
}
