//! Captured comparisons replayed through the client, with the ignore list applied

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use schema_merge::config::{Config, ScriptConfig};
use schema_merge::schema::types::{Column, Table};
use schema_merge::{
    ActionFilter, Capture, DatabaseMetadata, IgnoreList, Schema, SchemaMergeClient, ScriptActions,
    SqlServerScriptBuilder,
};

fn config(ignore_file: &std::path::Path) -> Config {
    Config {
        source: None,
        ignore_file: ignore_file.display().to_string(),
        targets: Vec::new(),
        script: ScriptConfig::default(),
        logging: None,
    }
}

fn capture() -> Capture {
    let source = Schema::new()
        .with_table(Table::new("dbo.Audit").with_column(Column::new("Id", "int")))
        .with_table(
            Table::new("dbo.Widget")
                .with_column(Column::new("Id", "int"))
                .with_column(Column::new("Label", "nvarchar(30)").nullable(true)),
        );
    let target = Schema::new().with_table(Table::new("dbo.Widget").with_column(Column::new("Id", "int")));

    let mut metadata = DatabaseMetadata::default();
    metadata.schemas.insert("dbo".to_string());
    metadata.table_names.insert("dbo.Widget".to_string());

    Capture {
        source,
        target,
        metadata,
        statements: Vec::new(),
    }
}

#[tokio::test]
async fn replay_plans_with_captured_metadata() {
    let dir = tempdir().unwrap();
    capture().write(dir.path().join("case")).unwrap();

    let client = SchemaMergeClient::new(config(&dir.path().join("ignore.json"))).unwrap();
    let (replayed, actions) = client.replay(dir.path().join("case"), false).await.unwrap();
    let builder = SqlServerScriptBuilder::with_metadata(replayed.metadata);

    assert_eq!(
        actions.to_sql_statements(&builder, false),
        vec![
            "CREATE TABLE [dbo].[Audit] (\n\t[Id] int NOT NULL\n)",
            "ALTER TABLE [dbo].[Widget] ADD [Label] nvarchar(30) NULL",
        ]
    );
}

#[tokio::test]
async fn ignored_objects_stay_out_of_later_plans() {
    let dir = tempdir().unwrap();
    let ignore_path = dir.path().join("ignore.json");
    capture().write(dir.path().join("case")).unwrap();

    let mut client = SchemaMergeClient::new(config(&ignore_path)).unwrap();
    let (_, actions) = client.replay(dir.path().join("case"), false).await.unwrap();
    assert_eq!(client.ignore_matching("table:dbo.Aud", &actions).unwrap(), 3);
    assert_eq!(IgnoreList::load(&ignore_path).unwrap().actions.len(), 3);

    let reloaded = SchemaMergeClient::new(config(&ignore_path)).unwrap();
    let (_, actions) = reloaded.replay(dir.path().join("case"), false).await.unwrap();
    assert_eq!(
        actions.to_compact_statements(),
        vec!["Create Column dbo.Widget.Label"]
    );
}

#[tokio::test]
async fn preview_filter_narrows_replayed_actions() {
    let dir = tempdir().unwrap();
    capture().write(dir.path().join("case")).unwrap();

    let client = SchemaMergeClient::new(config(&dir.path().join("ignore.json"))).unwrap();
    let (_, actions) = client.replay(dir.path().join("case"), true).await.unwrap();

    let filtered = ActionFilter::parse("table:audit").unwrap().apply(actions);
    assert_eq!(filtered.to_compact_statements(), vec!["Create Table dbo.Audit"]);
}
