//! Database schema analyzer
//!
//! This module provides the inspectors that produce a [`Schema`] for one side of a
//! comparison: a live SQL Server catalog, a JSON file, or registered models.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::db::connection::{optional_str, required_bool, required_i32, required_str, DatabaseConnection};
use crate::error::{Error, Result};
use crate::schema::types::{
    CheckConstraint, Column, ForeignKey, ForeignKeyColumn, Index, IndexColumn, IndexType,
    Schema, SortDirection, Table,
};

/// Anything that can describe a complete schema
#[async_trait]
pub trait SchemaInspector: Send {
    async fn get_schema(&mut self) -> Result<Schema>;
}

/// Replays a schema previously written as JSON
pub struct JsonSchemaInspector {
    path: PathBuf,
}

impl JsonSchemaInspector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SchemaInspector for JsonSchemaInspector {
    async fn get_schema(&mut self) -> Result<Schema> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        Schema::from_json(&json)
    }
}

const TABLES_SQL: &str = "WITH [clusteredIndexes] AS (
        SELECT [name], [object_id] FROM [sys].[indexes] WHERE [type_desc]='CLUSTERED'
    ), [identityColumns] AS (
        SELECT [object_id], [name] FROM [sys].[columns] WHERE [is_identity]=1
    ) SELECT
        SCHEMA_NAME([t].[schema_id]) + '.' + [t].[name],
        [t].[object_id],
        [c].[name],
        [i].[name]
    FROM [sys].[tables] [t]
    LEFT JOIN [clusteredIndexes] [c] ON [t].[object_id]=[c].[object_id]
    LEFT JOIN [identityColumns] [i] ON [t].[object_id]=[i].[object_id]
    WHERE [t].[name] NOT IN ('__MigrationHistory', '__EFMigrationsHistory')";

const COLUMNS_SQL: &str = "SELECT
        [col].[object_id],
        [col].[name],
        CASE
            WHEN TYPE_NAME([col].[system_type_id]) IN ('decimal', 'numeric') THEN
                TYPE_NAME([col].[system_type_id]) + '(' + CONVERT(varchar, [col].[precision]) + ',' + CONVERT(varchar, [col].[scale]) + ')'
            WHEN [col].[max_length]=-1 THEN
                TYPE_NAME([col].[system_type_id]) + '(max)'
            WHEN TYPE_NAME([col].[system_type_id]) IN ('nvarchar', 'nchar') THEN
                TYPE_NAME([col].[system_type_id]) + '(' + CONVERT(varchar, [col].[max_length] / 2) + ')'
            WHEN TYPE_NAME([col].[system_type_id]) IN ('varchar', 'char', 'varbinary', 'binary') THEN
                TYPE_NAME([col].[system_type_id]) + '(' + CONVERT(varchar, [col].[max_length]) + ')'
            ELSE TYPE_NAME([col].[system_type_id])
        END,
        [col].[is_nullable],
        [def].[definition],
        [col].[column_id],
        [calc].[definition]
    FROM [sys].[columns] [col]
    INNER JOIN [sys].[tables] [t] ON [col].[object_id]=[t].[object_id]
    LEFT JOIN [sys].[default_constraints] [def] ON [col].[default_object_id]=[def].[object_id]
    LEFT JOIN [sys].[computed_columns] [calc] ON [col].[object_id]=[calc].[object_id] AND [col].[column_id]=[calc].[column_id]
    WHERE [t].[type_desc]='USER_TABLE'
    ORDER BY [col].[object_id], [col].[column_id]";

const INDEXES_SQL: &str = "SELECT
        [x].[object_id],
        [x].[name],
        CONVERT(bit, CASE WHEN [x].[type_desc]='CLUSTERED' THEN 1 ELSE 0 END),
        CASE
            WHEN [x].[is_primary_key]=1 THEN 1
            WHEN [x].[is_unique]=1 AND [x].[is_unique_constraint]=0 THEN 2
            WHEN [x].[is_unique_constraint]=1 THEN 3
            ELSE 4
        END,
        [x].[index_id]
    FROM [sys].[indexes] [x]
    INNER JOIN [sys].[tables] [t] ON [x].[object_id]=[t].[object_id]
    WHERE [t].[type_desc]='USER_TABLE' AND [x].[type]<>0";

const INDEX_COLUMNS_SQL: &str = "SELECT
        [xcol].[object_id],
        [xcol].[index_id],
        [col].[name],
        CONVERT(int, [xcol].[key_ordinal]),
        [xcol].[is_descending_key]
    FROM [sys].[index_columns] [xcol]
    INNER JOIN [sys].[indexes] [x] ON [xcol].[object_id]=[x].[object_id] AND [xcol].[index_id]=[x].[index_id]
    INNER JOIN [sys].[columns] [col] ON [xcol].[object_id]=[col].[object_id] AND [xcol].[column_id]=[col].[column_id]
    INNER JOIN [sys].[tables] [t] ON [x].[object_id]=[t].[object_id]
    WHERE [t].[type_desc]='USER_TABLE' AND [xcol].[key_ordinal]>0";

const CHECKS_SQL: &str = "SELECT [ck].[parent_object_id], [ck].[name], [ck].[definition]
    FROM [sys].[check_constraints] [ck]
    WHERE [ck].[type]='C'";

const FOREIGN_KEYS_SQL: &str = "SELECT
        [fk].[object_id],
        [fk].[name],
        SCHEMA_NAME([child_t].[schema_id]) + '.' + [child_t].[name],
        SCHEMA_NAME([ref_t].[schema_id]) + '.' + [ref_t].[name],
        CONVERT(bit, CASE WHEN [fk].[delete_referential_action]=1 THEN 1 ELSE 0 END),
        CONVERT(bit, CASE WHEN [fk].[update_referential_action]=1 THEN 1 ELSE 0 END)
    FROM [sys].[foreign_keys] [fk]
    INNER JOIN [sys].[tables] [ref_t] ON [fk].[referenced_object_id]=[ref_t].[object_id]
    INNER JOIN [sys].[tables] [child_t] ON [fk].[parent_object_id]=[child_t].[object_id]";

const FOREIGN_KEY_COLUMNS_SQL: &str = "SELECT
        [fkcol].[constraint_object_id],
        [child_col].[name],
        [ref_col].[name]
    FROM [sys].[foreign_key_columns] [fkcol]
    INNER JOIN [sys].[columns] [child_col] ON
        [fkcol].[parent_object_id]=[child_col].[object_id] AND [fkcol].[parent_column_id]=[child_col].[column_id]
    INNER JOIN [sys].[columns] [ref_col] ON
        [fkcol].[referenced_object_id]=[ref_col].[object_id] AND [fkcol].[referenced_column_id]=[ref_col].[column_id]
    ORDER BY [fkcol].[constraint_object_id], [fkcol].[constraint_column_id]";

/// Reads a schema from the SQL Server catalog views
pub struct SqlServerAnalyzer {
    connection: DatabaseConnection,
}

impl SqlServerAnalyzer {
    /// Create a new schema analyzer
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    pub async fn connect(connection_string: &str) -> Result<Self> {
        Ok(Self::new(DatabaseConnection::connect(connection_string).await?))
    }

    async fn analyze_tables(&mut self) -> Result<Vec<Table>> {
        let rows = self.connection.query(TABLES_SQL).await?;
        rows.iter()
            .map(|row| -> Result<Table> {
                Ok(Table {
                    name: required_str(row, 0)?,
                    object_id: i64::from(required_i32(row, 1)?),
                    clustered_index_name: optional_str(row, 2)?,
                    identity_column_name: optional_str(row, 3)?,
                    ..Default::default()
                })
            })
            .collect()
    }

    async fn analyze_columns(&mut self) -> Result<HashMap<i32, Vec<Column>>> {
        let mut columns: HashMap<i32, Vec<Column>> = HashMap::new();
        for row in self.connection.query(COLUMNS_SQL).await? {
            let expression = optional_str(&row, 6)?;
            let column = Column {
                name: required_str(&row, 1)?,
                data_type: required_str(&row, 2)?,
                is_nullable: required_bool(&row, 3)?,
                default_value: optional_str(&row, 4)?,
                position: Some(required_i32(&row, 5)?),
                is_calculated: expression.is_some(),
                expression,
                ..Default::default()
            };
            columns.entry(required_i32(&row, 0)?).or_default().push(column);
        }
        Ok(columns)
    }

    async fn analyze_indexes(&mut self) -> Result<HashMap<i32, Vec<Index>>> {
        let mut index_columns: HashMap<(i32, i32), Vec<IndexColumn>> = HashMap::new();
        for row in self.connection.query(INDEX_COLUMNS_SQL).await? {
            let column = IndexColumn {
                name: required_str(&row, 2)?,
                order: required_i32(&row, 3)?,
                direction: if required_bool(&row, 4)? {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                },
            };
            index_columns
                .entry((required_i32(&row, 0)?, required_i32(&row, 1)?))
                .or_default()
                .push(column);
        }

        let mut indexes: HashMap<i32, Vec<Index>> = HashMap::new();
        for row in self.connection.query(INDEXES_SQL).await? {
            let object_id = required_i32(&row, 0)?;
            let index_id = required_i32(&row, 4)?;
            let index = Index {
                name: required_str(&row, 1)?,
                is_clustered: required_bool(&row, 2)?,
                index_type: index_type(required_i32(&row, 3)?)?,
                columns: index_columns.remove(&(object_id, index_id)).unwrap_or_default(),
                ..Default::default()
            };
            indexes.entry(object_id).or_default().push(index);
        }
        Ok(indexes)
    }

    async fn analyze_check_constraints(&mut self) -> Result<HashMap<i32, Vec<CheckConstraint>>> {
        let mut checks: HashMap<i32, Vec<CheckConstraint>> = HashMap::new();
        for row in self.connection.query(CHECKS_SQL).await? {
            let check = CheckConstraint::new(&required_str(&row, 1)?, &required_str(&row, 2)?);
            checks.entry(required_i32(&row, 0)?).or_default().push(check);
        }
        Ok(checks)
    }

    async fn analyze_foreign_keys(&mut self) -> Result<Vec<ForeignKey>> {
        let mut fk_columns: HashMap<i32, Vec<ForeignKeyColumn>> = HashMap::new();
        for row in self.connection.query(FOREIGN_KEY_COLUMNS_SQL).await? {
            fk_columns
                .entry(required_i32(&row, 0)?)
                .or_default()
                .push(ForeignKeyColumn::new(&required_str(&row, 1)?, &required_str(&row, 2)?));
        }

        let rows = self.connection.query(FOREIGN_KEYS_SQL).await?;
        rows.iter()
            .map(|row| -> Result<ForeignKey> {
                let object_id = required_i32(row, 0)?;
                Ok(ForeignKey {
                    object_id: i64::from(object_id),
                    name: required_str(row, 1)?,
                    parent: required_str(row, 2)?,
                    referenced_table: required_str(row, 3)?,
                    cascade_delete: required_bool(row, 4)?,
                    cascade_update: required_bool(row, 5)?,
                    columns: fk_columns.remove(&object_id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn index_type(value: i32) -> Result<IndexType> {
    match value {
        1 => Ok(IndexType::PrimaryKey),
        2 => Ok(IndexType::UniqueIndex),
        3 => Ok(IndexType::UniqueConstraint),
        4 => Ok(IndexType::NonUnique),
        other => Err(Error::SchemaAnalysisError(format!("Unknown index type {}", other))),
    }
}

#[async_trait]
impl SchemaInspector for SqlServerAnalyzer {
    async fn get_schema(&mut self) -> Result<Schema> {
        let mut tables = self.analyze_tables().await?;
        let mut columns = self.analyze_columns().await?;
        let mut indexes = self.analyze_indexes().await?;
        let mut checks = self.analyze_check_constraints().await?;
        let foreign_keys = self.analyze_foreign_keys().await?;

        for table in &mut tables {
            // catalog object ids are i32; the model widens them
            let id = table.object_id as i32;
            table.columns = columns.remove(&id).unwrap_or_default();
            table.indexes = indexes.remove(&id).unwrap_or_default();
            table.check_constraints = checks.remove(&id).unwrap_or_default();
        }

        tracing::info!(
            tables = tables.len(),
            foreign_keys = foreign_keys.len(),
            "Analyzed database schema"
        );

        let mut schema = Schema {
            tables,
            foreign_keys,
        };
        schema.link_parents();
        Ok(schema)
    }
}
