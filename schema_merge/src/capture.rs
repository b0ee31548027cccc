//! Test-case capture and replay
//!
//! A capture directory holds everything needed to re-run a comparison offline:
//! both schemas, the target metadata snapshot and the statements that were produced.

use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::schema::generator::DatabaseMetadata;
use crate::schema::types::Schema;

pub const SOURCE_FILE: &str = "source.json";
pub const TARGET_FILE: &str = "target.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const STATEMENTS_FILE: &str = "statements.json";

/// A captured comparison
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub source: Schema,
    pub target: Schema,
    pub metadata: DatabaseMetadata,
    pub statements: Vec<String>,
}

impl Capture {
    /// Write the four capture files into `dir`, creating it if needed
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        fs::write(dir.join(SOURCE_FILE), self.source.to_json()?)?;
        fs::write(dir.join(TARGET_FILE), self.target.to_json()?)?;
        fs::write(
            dir.join(METADATA_FILE),
            serde_json::to_string_pretty(&self.metadata)?,
        )?;
        fs::write(
            dir.join(STATEMENTS_FILE),
            serde_json::to_string_pretty(&self.statements)?,
        )?;

        tracing::info!(dir = %dir.display(), "Captured comparison");
        Ok(())
    }

    /// Load a capture directory; a missing statements file is an empty list
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let source = Schema::from_json(&fs::read_to_string(dir.join(SOURCE_FILE))?)?;
        let target = Schema::from_json(&fs::read_to_string(dir.join(TARGET_FILE))?)?;
        let metadata = serde_json::from_str(&fs::read_to_string(dir.join(METADATA_FILE))?)?;

        let statements_path = dir.join(STATEMENTS_FILE);
        let statements = if statements_path.exists() {
            serde_json::from_str(&fs::read_to_string(statements_path)?)?
        } else {
            Vec::new()
        };

        Ok(Self {
            source,
            target,
            metadata,
            statements,
        })
    }
}

/// Render a schema as a markdown document
pub fn schema_markdown(schema: &Schema, title: &str) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}", title);
    let _ = writeln!(md);
    let _ = writeln!(md, "Generated {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));

    for table in &schema.tables {
        let _ = writeln!(md);
        let _ = writeln!(md, "## {}", table.name);
        let _ = writeln!(md);
        let _ = writeln!(md, "| Column | Type | Nullable | Default |");
        let _ = writeln!(md, "|---|---|---|---|");

        let mut columns: Vec<_> = table.columns.iter().collect();
        columns.sort_by_key(|column| column.position.unwrap_or(i32::MAX));
        for column in columns {
            let data_type = match &column.expression {
                Some(expression) if column.is_calculated => format!("AS {}", expression),
                _ => column.data_type.clone(),
            };
            let identity = if table.is_identity_column(&column.name) {
                " (identity)"
            } else {
                ""
            };
            let _ = writeln!(
                md,
                "| {}{} | {} | {} | {} |",
                column.name,
                identity,
                data_type,
                if column.is_nullable { "yes" } else { "no" },
                column.default_value.as_deref().unwrap_or("")
            );
        }

        if !table.indexes.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "Indexes:");
            for index in &table.indexes {
                let columns: Vec<&str> = index
                    .ordered_columns()
                    .into_iter()
                    .map(|column| column.name.as_str())
                    .collect();
                let _ = writeln!(
                    md,
                    "- {} ({:?}): {}",
                    index.name,
                    index.index_type,
                    columns.join(", ")
                );
            }
        }

        if !table.check_constraints.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "Check constraints:");
            for check in &table.check_constraints {
                let _ = writeln!(md, "- {}: `{}`", check.name, check.expression);
            }
        }

        let foreign_keys: Vec<_> = schema
            .foreign_keys
            .iter()
            .filter(|fk| fk.parent.eq_ignore_ascii_case(&table.name))
            .collect();
        if !foreign_keys.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "Foreign keys:");
            for fk in foreign_keys {
                let columns: Vec<String> = fk
                    .columns
                    .iter()
                    .map(|column| format!("{} -> {}", column.referencing_name, column.referenced_name))
                    .collect();
                let _ = writeln!(
                    md,
                    "- {} references {} ({})",
                    fk.name,
                    fk.referenced_table,
                    columns.join(", ")
                );
            }
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Column, ForeignKey, Index, IndexType, Table};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn schema() -> Schema {
        Schema::new()
            .with_table(
                Table::new("dbo.Customer")
                    .with_column(Column::new("Id", "int").position(1))
                    .with_column(Column::new("Name", "nvarchar(50)").nullable(true).position(2))
                    .with_index(Index::new("PK_Customer", IndexType::PrimaryKey, &["Id"]))
                    .identity("Id"),
            )
            .with_table(Table::new("dbo.Order").with_column(Column::new("CustomerId", "int")))
            .with_foreign_key(
                ForeignKey::new("FK_Order_CustomerId", "dbo.Order", "dbo.Customer")
                    .with_column("CustomerId", "Id"),
            )
    }

    #[test]
    fn capture_round_trips() {
        let dir = tempdir().unwrap();
        let mut metadata = DatabaseMetadata::default();
        metadata.table_names.insert("dbo.Customer".to_string());
        metadata.row_counts.insert("dbo.Customer".to_string(), 12);

        let capture = Capture {
            source: schema(),
            target: Schema::new(),
            metadata: metadata.clone(),
            statements: vec!["CREATE TABLE [dbo].[Order] ()".to_string()],
        };
        capture.write(dir.path().join("case1")).unwrap();

        let loaded = Capture::load(dir.path().join("case1")).unwrap();
        assert_eq!(loaded.metadata, metadata);
        assert_eq!(loaded.statements, capture.statements);
        assert_eq!(loaded.source.tables.len(), 2);
        assert_eq!(loaded.source.foreign_keys[0].name, "FK_Order_CustomerId");
    }

    #[test]
    fn markdown_lists_columns_indexes_and_keys() {
        let md = schema_markdown(&schema(), "Source");

        assert!(md.starts_with("# Source\n"));
        assert!(md.contains("## dbo.Customer"));
        assert!(md.contains("| Id (identity) | int | no |  |"));
        assert!(md.contains("| Name | nvarchar(50) | yes |  |"));
        assert!(md.contains("- PK_Customer (PrimaryKey): Id"));
        assert!(md.contains("- FK_Order_CustomerId references dbo.Customer (CustomerId -> Id)"));
    }
}
