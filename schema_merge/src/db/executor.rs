//! SQL executor
//!
//! This module runs generated scripts against the target and reads the metadata
//! snapshot the comparison engine filters with.

use tiberius::Row;

use crate::db::connection::{required_str, DatabaseConnection};
use crate::error::{Error, Result};
use crate::schema::generator::DatabaseMetadata;

const SCHEMAS_SQL: &str = "SELECT [name] FROM [sys].[schemas]";

const TABLES_SQL: &str = "SELECT SCHEMA_NAME([schema_id]) + '.' + [name] FROM [sys].[tables]";

const FOREIGN_KEYS_SQL: &str = "SELECT [name] FROM [sys].[foreign_keys]";

const INDEXES_SQL: &str = "SELECT [x].[name]
    FROM [sys].[indexes] [x]
    INNER JOIN [sys].[tables] [t] ON [x].[object_id]=[t].[object_id]
    WHERE [x].[name] IS NOT NULL";

const ROW_COUNTS_SQL: &str = "SELECT
        SCHEMA_NAME([t].[schema_id]) + '.' + [t].[name] AS [TableName],
        SUM([st].[row_count]) AS [RowCount]
    FROM [sys].[dm_db_partition_stats] [st]
    INNER JOIN [sys].[tables] [t] ON [st].[object_id]=[t].[object_id]
    WHERE [st].[index_id] IN (0, 1)
    GROUP BY SCHEMA_NAME([t].[schema_id]), [t].[name]";

/// SQL executor for running statements against one connection
pub struct SqlExecutor {
    connection: DatabaseConnection,
}

impl SqlExecutor {
    /// Create a new SQL executor
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Execute a single SQL statement
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "Executing statement");
        self.connection.execute(sql).await
    }

    /// Execute multiple SQL statements in order, stopping at the first failure
    pub async fn execute_batch(&mut self, statements: &[String]) -> Result<()> {
        for statement in statements {
            self.execute(statement).await?;
        }

        Ok(())
    }

    /// Execute multiple SQL statements in a transaction.
    ///
    /// Any failure rolls back the whole batch and the driver error is returned as is.
    pub async fn execute_in_transaction(&mut self, statements: &[String]) -> Result<()> {
        self.execute("BEGIN TRANSACTION").await?;

        match self.execute_batch(statements).await {
            Ok(()) => {
                self.execute("COMMIT TRANSACTION").await?;
                tracing::info!(statements = statements.len(), "Merge committed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Merge failed, rolling back");
                if let Err(rollback) = self.execute("ROLLBACK TRANSACTION").await {
                    tracing::error!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Query schemas, tables, keys, indexes and row counts of the target
    pub async fn fetch_metadata(&mut self) -> Result<DatabaseMetadata> {
        let schemas = self.connection.query_strings(SCHEMAS_SQL).await?;
        let tables = self.connection.query_strings(TABLES_SQL).await?;
        let foreign_keys = self.connection.query_strings(FOREIGN_KEYS_SQL).await?;
        let indexes = self.connection.query_strings(INDEXES_SQL).await?;

        let row_counts = self
            .connection
            .query(ROW_COUNTS_SQL)
            .await?
            .iter()
            .map(row_count)
            .collect::<Result<_>>()?;

        Ok(DatabaseMetadata {
            schemas: schemas.into_iter().collect(),
            table_names: tables.into_iter().collect(),
            foreign_key_names: foreign_keys.into_iter().collect(),
            index_names: indexes.into_iter().collect(),
            row_counts,
        })
    }

    /// Get database connection
    pub fn connection(&mut self) -> &mut DatabaseConnection {
        &mut self.connection
    }
}

fn row_count(row: &Row) -> Result<(String, i64)> {
    let table = required_str(row, 0)?;
    let rows = row
        .try_get::<i64, _>(1)?
        .ok_or_else(|| Error::SchemaAnalysisError(format!("Missing row count for {}", table)))?;
    Ok((table, rows))
}
