//! SQL Server dialect
//!
//! Renders T-SQL for every object kind and reads the metadata snapshot from a live
//! server through [`DatabaseConnection`].

use async_trait::async_trait;

use crate::db::connection::DatabaseConnection;
use crate::db::executor::SqlExecutor;
use crate::error::{Error, Result};
use crate::schema::action::Statement;
use crate::schema::generator::{DatabaseMetadata, ScriptBuilder};
use crate::schema::types::{
    CheckConstraint, Column, ForeignKey, Index, IndexType, SortDirection, Table,
};
use crate::utils::naming::quote_identifier;

pub const DEFAULT_SCHEMA: &str = "dbo";

/// Bracket-quote each dot-separated segment: `dbo.Employee` becomes `[dbo].[Employee]`
pub fn format_name(name: &str) -> String {
    name.split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a table name into schema and table, defaulting the schema
pub fn parse_table_name(name: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = name
        .split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    match parts.as_slice() {
        [table] => Ok((DEFAULT_SCHEMA, *table)),
        [schema, table] => Ok((*schema, *table)),
        _ => Err(Error::InvalidName(name.to_string())),
    }
}

/// Fully qualified, quoted table name
pub fn format_table_name(name: &str) -> Result<String> {
    let (schema, table) = parse_table_name(name)?;
    Ok(format!("{}.{}", quote_identifier(schema), quote_identifier(table)))
}

/// Statement builder for Microsoft SQL Server
#[derive(Debug, Clone, Default)]
pub struct SqlServerScriptBuilder {
    connection_string: Option<String>,
    metadata: DatabaseMetadata,
    inspected: bool,
}

impl SqlServerScriptBuilder {
    /// Builder that inspects the database behind `connection_string` on first use
    pub fn new(connection_string: &str) -> Self {
        Self {
            connection_string: Some(connection_string.to_string()),
            ..Default::default()
        }
    }

    /// Builder with a fixed metadata snapshot and no live connection
    pub fn with_metadata(metadata: DatabaseMetadata) -> Self {
        Self {
            connection_string: None,
            metadata,
            inspected: true,
        }
    }

    fn index_column_list(&self, index: &Index) -> String {
        let columns: Vec<String> = index
            .ordered_columns()
            .into_iter()
            .map(|col| {
                let direction = match col.direction {
                    SortDirection::Ascending => "ASC",
                    SortDirection::Descending => "DESC",
                };
                format!("{} {}", format_name(&col.name), direction)
            })
            .collect();

        format!("({})", columns.join(", "))
    }

    fn foreign_key_definition(&self, fk: &ForeignKey) -> Result<String> {
        let referencing: Vec<String> = fk
            .columns
            .iter()
            .map(|col| format_name(&col.referencing_name))
            .collect();
        let referenced: Vec<String> = fk
            .columns
            .iter()
            .map(|col| format_name(&col.referenced_name))
            .collect();

        let mut definition = format!(
            "{} FOREIGN KEY ({}) REFERENCES {} ({})",
            format_name(&fk.name),
            referencing.join(", "),
            format_table_name(&fk.referenced_table)?,
            referenced.join(", ")
        );

        if fk.cascade_delete {
            definition.push_str(" ON DELETE CASCADE");
        }
        if fk.cascade_update {
            definition.push_str(" ON UPDATE CASCADE");
        }

        Ok(definition)
    }

    /// Column sort key for `CREATE TABLE`; the identity or key column always leads
    fn column_order(table: &Table, column: &Column) -> i64 {
        let leads = match &table.identity_column_name {
            Some(_) => table.is_identity_column(&column.name),
            None => table.is_primary_key_column(&column.name),
        };

        if leads {
            i64::MIN
        } else {
            column.position.map(i64::from).unwrap_or(i64::MAX)
        }
    }
}

#[async_trait]
impl ScriptBuilder for SqlServerScriptBuilder {
    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    fn set_metadata(&mut self, metadata: DatabaseMetadata) {
        self.metadata = metadata;
        self.inspected = true;
    }

    fn has_metadata(&self) -> bool {
        self.inspected
    }

    async fn fetch_metadata(&self) -> Result<DatabaseMetadata> {
        let connection_string = self.connection_string.as_deref().ok_or_else(|| {
            Error::ConfigError("No connection string to inspect the target with".to_string())
        })?;

        let connection = DatabaseConnection::connect(connection_string).await?;
        SqlExecutor::new(connection).fetch_metadata().await
    }

    fn create_table(&self, table: &Table) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        let (schema, _) = parse_table_name(&table.name)?;
        if !self.metadata.has_schema(schema) {
            statements.push(Statement::bare(format!("CREATE SCHEMA {}", format_name(schema))));
        }

        let mut columns: Vec<&Column> = table.columns.iter().collect();
        columns.sort_by_key(|col| Self::column_order(table, col));

        let definitions = columns
            .into_iter()
            .map(|col| self.column_definition(table, col))
            .collect::<Result<Vec<_>>>()?;

        statements.push(Statement::new(
            format!(
                "CREATE TABLE {} (\n\t{}\n)",
                format_table_name(&table.name)?,
                definitions.join(",\n\t")
            ),
            table.clone(),
        ));

        for index in &table.indexes {
            statements.extend(self.create_index(table, index)?);
        }

        for check in &table.check_constraints {
            statements.extend(self.create_check_constraint(table, check)?);
        }

        Ok(statements)
    }

    fn drop_table(&self, table: &Table) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(
            format!("DROP TABLE {}", format_table_name(&table.name)?),
            table.clone(),
        )])
    }

    fn column_definition(&self, table: &Table, column: &Column) -> Result<String> {
        if column.is_calculated {
            return Ok(format!(
                "{} AS {} PERSISTED",
                format_name(&column.name),
                column.expression.as_deref().unwrap_or_default()
            ));
        }

        let mut data_type = column.data_type.clone();
        if table.is_identity_column(&column.name) {
            data_type.push_str(" identity(1,1)");
        }

        Ok(format!(
            "{} {} {}",
            format_name(&column.name),
            data_type,
            if column.is_nullable { "NULL" } else { "NOT NULL" }
        ))
    }

    fn add_column(&self, table: &Table, column: &Column) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(
            format!(
                "ALTER TABLE {} ADD {}",
                format_table_name(&table.name)?,
                self.column_definition(table, column)?
            ),
            column.clone(),
        )])
    }

    fn alter_column(&self, table: &Table, column: &Column) -> Result<Vec<Statement>> {
        if column.is_calculated {
            let mut statements = self.drop_column(table, column)?;
            statements.extend(self.add_column(table, column)?);
            return Ok(statements);
        }

        Ok(vec![Statement::new(
            format!(
                "ALTER TABLE {} ALTER COLUMN {}",
                format_table_name(&table.name)?,
                self.column_definition(table, column)?
            ),
            column.clone(),
        )])
    }

    fn drop_column(&self, table: &Table, column: &Column) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(
            format!(
                "ALTER TABLE {} DROP COLUMN {}",
                format_table_name(&table.name)?,
                format_name(&column.name)
            ),
            column.clone(),
        )])
    }

    fn create_index(&self, table: &Table, index: &Index) -> Result<Vec<Statement>> {
        let table_name = format_table_name(&table.name)?;
        let index_name = format_name(&index.name);
        let columns = self.index_column_list(index);

        let sql = match index.index_type {
            IndexType::PrimaryKey => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY {}",
                table_name, index_name, columns
            ),
            IndexType::UniqueConstraint => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE {}",
                table_name, index_name, columns
            ),
            IndexType::UniqueIndex => format!(
                "CREATE UNIQUE INDEX {} ON {} {}",
                index_name, table_name, columns
            ),
            IndexType::NonUnique => {
                format!("CREATE INDEX {} ON {} {}", index_name, table_name, columns)
            }
        };

        Ok(vec![Statement::new(sql, index.clone())])
    }

    fn drop_index(&self, table: &Table, index: &Index) -> Result<Vec<Statement>> {
        let table_name = format_table_name(&table.name)?;
        let index_name = format_name(&index.name);

        let sql = match index.index_type {
            IndexType::UniqueIndex | IndexType::NonUnique => {
                format!("DROP INDEX {} ON {}", index_name, table_name)
            }
            IndexType::PrimaryKey | IndexType::UniqueConstraint => {
                format!("ALTER TABLE {} DROP CONSTRAINT {}", table_name, index_name)
            }
        };

        Ok(vec![Statement::new(sql, index.clone())])
    }

    fn create_foreign_key(&self, fk: &ForeignKey) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {}",
                format_table_name(&fk.parent)?,
                self.foreign_key_definition(fk)?
            ),
            fk.clone(),
        )])
    }

    fn drop_foreign_key(&self, fk: &ForeignKey) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(
            format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                format_table_name(&fk.parent)?,
                format_name(&fk.name)
            ),
            fk.clone(),
        )])
    }

    fn create_check_constraint(&self, table: &Table, check: &CheckConstraint) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
                format_table_name(&table.name)?,
                format_name(&check.name),
                check.expression
            ),
            check.clone(),
        )])
    }

    fn drop_check_constraint(&self, table: &Table, check: &CheckConstraint) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(
            format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                format_table_name(&table.name)?,
                format_name(&check.name)
            ),
            check.clone(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::IndexColumn;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn builder() -> SqlServerScriptBuilder {
        SqlServerScriptBuilder::with_metadata(DatabaseMetadata {
            schemas: ["dbo".to_string()].into(),
            ..Default::default()
        })
    }

    fn sql(statements: Vec<Statement>) -> Vec<String> {
        statements.into_iter().map(|st| st.sql).collect()
    }

    #[rstest]
    #[case("Employee", "[dbo].[Employee]")]
    #[case("dbo.Employee", "[dbo].[Employee]")]
    #[case(" hr . Employee ", "[hr].[Employee]")]
    fn table_names_are_qualified_and_quoted(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(format_table_name(name).unwrap(), expected);
    }

    #[test]
    fn too_many_name_segments_is_an_error() {
        assert!(matches!(
            format_table_name("server.dbo.Employee"),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn create_table_orders_columns_and_leads_with_identity() {
        let table = Table::new("dbo.Employee")
            .with_column(Column::new("Name", "nvarchar(50)").position(2))
            .with_column(Column::new("Notes", "nvarchar(max)").nullable(true).position(3))
            .with_column(Column::new("Id", "int").position(7))
            .identity("Id")
            .with_index(Index::new("PK_Employee", IndexType::PrimaryKey, &["Id"]));

        assert_eq!(
            sql(builder().create_table(&table).unwrap()),
            vec![
                "CREATE TABLE [dbo].[Employee] (\n\t[Id] int identity(1,1) NOT NULL,\n\t[Name] nvarchar(50) NOT NULL,\n\t[Notes] nvarchar(max) NULL\n)",
                "ALTER TABLE [dbo].[Employee] ADD CONSTRAINT [PK_Employee] PRIMARY KEY ([Id] ASC)",
            ]
        );
    }

    #[test]
    fn create_table_creates_missing_schema_first() {
        let table = Table::new("hr.Badge")
            .with_column(Column::new("Code", "char(4)"))
            .with_check_constraint(CheckConstraint::new("CK_Badge_Code", "len([Code])=4"));

        assert_eq!(
            sql(builder().create_table(&table).unwrap()),
            vec![
                "CREATE SCHEMA [hr]",
                "CREATE TABLE [hr].[Badge] (\n\t[Code] char(4) NOT NULL\n)",
                "ALTER TABLE [hr].[Badge] ADD CONSTRAINT [CK_Badge_Code] CHECK (len([Code])=4)",
            ]
        );
    }

    #[test]
    fn calculated_columns_are_rebuilt_instead_of_altered() {
        let table = Table::new("dbo.Order");
        let total = Column::new("Total", "decimal(10,2)").calculated("[Price]*[Quantity]");

        assert_eq!(
            sql(builder().alter_column(&table, &total).unwrap()),
            vec![
                "ALTER TABLE [dbo].[Order] DROP COLUMN [Total]",
                "ALTER TABLE [dbo].[Order] ADD [Total] AS [Price]*[Quantity] PERSISTED",
            ]
        );
    }

    #[rstest]
    #[case(IndexType::PrimaryKey, "ALTER TABLE [dbo].[T] ADD CONSTRAINT [X] PRIMARY KEY ([A] ASC, [B] DESC)", "ALTER TABLE [dbo].[T] DROP CONSTRAINT [X]")]
    #[case(IndexType::UniqueConstraint, "ALTER TABLE [dbo].[T] ADD CONSTRAINT [X] UNIQUE ([A] ASC, [B] DESC)", "ALTER TABLE [dbo].[T] DROP CONSTRAINT [X]")]
    #[case(IndexType::UniqueIndex, "CREATE UNIQUE INDEX [X] ON [dbo].[T] ([A] ASC, [B] DESC)", "DROP INDEX [X] ON [dbo].[T]")]
    #[case(IndexType::NonUnique, "CREATE INDEX [X] ON [dbo].[T] ([A] ASC, [B] DESC)", "DROP INDEX [X] ON [dbo].[T]")]
    fn index_statements_follow_index_type(
        #[case] index_type: IndexType,
        #[case] create: &str,
        #[case] drop: &str,
    ) {
        let table = Table::new("dbo.T");
        let index = Index {
            name: "X".to_string(),
            index_type,
            columns: vec![
                IndexColumn::new("B").descending().order(2),
                IndexColumn::new("A").order(1),
            ],
            ..Default::default()
        };

        let builder = builder();
        assert_eq!(sql(builder.create_index(&table, &index).unwrap()), vec![create]);
        assert_eq!(sql(builder.drop_index(&table, &index).unwrap()), vec![drop]);
        assert_eq!(
            sql(builder.alter_index(&table, &index).unwrap()),
            vec![drop, create]
        );
    }

    #[test]
    fn foreign_key_with_cascades() {
        let fk = ForeignKey::new("FK_Employee_EmployeeType", "dbo.Employee", "dbo.EmployeeType")
            .with_column("EmployeeTypeId", "Id")
            .cascade_delete(true)
            .cascade_update(true);

        let builder = builder();
        assert_eq!(
            sql(builder.create_foreign_key(&fk).unwrap()),
            vec!["ALTER TABLE [dbo].[Employee] ADD CONSTRAINT [FK_Employee_EmployeeType] FOREIGN KEY ([EmployeeTypeId]) REFERENCES [dbo].[EmployeeType] ([Id]) ON DELETE CASCADE ON UPDATE CASCADE"]
        );
        assert_eq!(
            sql(builder.drop_foreign_key(&fk).unwrap()),
            vec!["ALTER TABLE [dbo].[Employee] DROP CONSTRAINT [FK_Employee_EmployeeType]"]
        );
    }

    #[tokio::test]
    async fn injected_metadata_skips_inspection() {
        let mut builder = builder();
        builder.inspect_target_database().await.unwrap();
        assert!(builder.metadata().has_schema("dbo"));
    }

    #[tokio::test]
    async fn inspection_without_connection_is_a_config_error() {
        let mut builder = SqlServerScriptBuilder::default();
        assert!(matches!(
            builder.inspect_target_database().await,
            Err(Error::ConfigError(_))
        ));
    }
}
