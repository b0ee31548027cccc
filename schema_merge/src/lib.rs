//! schema_merge: dependency-aware schema comparison for SQL Server
//!
//! A desired schema (a JSON file, a live database or `#[derive(SchemaModel)]` structs) is
//! compared with a live target. The result is an ordered list of create, alter and drop
//! actions whose statements drop and recreate dependent indexes and foreign keys as needed.

extern crate self as schema_merge;

pub mod capture;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod utils;

use std::path::Path;

// Re-export main types for easier access
pub use capture::Capture;
pub use config::{Config, TargetConfig};
pub use db::{DatabaseConnection, SqlExecutor};
pub use error::{Error, Result};
pub use models::{ModelRegistry, SchemaModel};
pub use schema::{
    ActionFilter, ActionKind, DatabaseMetadata, IgnoreList, Schema, ScriptAction, ScriptActions,
    ScriptBuilder, SqlServerScriptBuilder,
};
pub use schema_merge_macros::SchemaModel;

use schema::{JsonSchemaInspector, SchemaInspector, SqlServerAnalyzer};

/// Load configuration and build a client
pub async fn init(config_path: impl AsRef<Path>) -> Result<SchemaMergeClient> {
    let config = config::load_from_file(config_path)?;
    SchemaMergeClient::new(config)
}

/// The main client: loads both sides, plans, and applies
pub struct SchemaMergeClient {
    config: Config,
    ignore: IgnoreList,
}

impl SchemaMergeClient {
    /// Create a client, reading the configured ignore file
    pub fn new(config: Config) -> Result<Self> {
        let ignore = IgnoreList::load(&config.ignore_file)?;
        Ok(Self { config, ignore })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// Add `kind:prefix` matches to the ignore list and persist it
    pub fn ignore_matching(&mut self, expression: &str, actions: &[ScriptAction]) -> Result<usize> {
        let added = self.ignore.add_matching(expression, actions)?;
        self.ignore.save(&self.config.ignore_file)?;
        tracing::info!(added, file = %self.config.ignore_file, "Updated ignore list");
        Ok(added)
    }

    /// Load the desired schema from a JSON file or a configured target.
    ///
    /// Falls back to the `source` setting when `source` is `None`.
    pub async fn load_source(&self, source: Option<&str>) -> Result<Schema> {
        let source = source
            .or(self.config.source.as_deref())
            .ok_or_else(|| Error::ConfigError("No source schema given".to_string()))?;

        if source.to_lowercase().ends_with(".json") || Path::new(source).is_file() {
            tracing::debug!(source, "Loading source schema from file");
            return JsonSchemaInspector::new(source).get_schema().await;
        }

        let target = self.config.target(Some(source))?;
        self.load_target(target).await
    }

    /// Inspect the current schema of a target database
    pub async fn load_target(&self, target: &TargetConfig) -> Result<Schema> {
        tracing::debug!(target = %target.name, "Inspecting target schema");
        let mut analyzer = SqlServerAnalyzer::connect(&target.connection_string).await?;
        analyzer.get_schema().await
    }

    /// Compare and drop ignored actions
    pub async fn plan<B>(
        &self,
        source: &mut Schema,
        target: &mut Schema,
        builder: &mut B,
        debug: bool,
    ) -> Result<Vec<ScriptAction>>
    where
        B: ScriptBuilder + ?Sized,
    {
        let actions = source.compare(target, builder, debug).await?;
        Ok(self.ignore.apply(actions))
    }

    /// Execute statements against a target in one transaction
    pub async fn apply(&self, target: &TargetConfig, statements: &[String]) -> Result<()> {
        if statements.is_empty() {
            tracing::info!("Nothing to merge");
            return Ok(());
        }

        let connection = DatabaseConnection::connect(&target.connection_string).await?;
        SqlExecutor::new(connection)
            .execute_in_transaction(statements)
            .await
    }

    /// Re-plan a captured comparison with its captured metadata
    pub async fn replay(&self, dir: impl AsRef<Path>, debug: bool) -> Result<(Capture, Vec<ScriptAction>)> {
        let mut capture = Capture::load(dir)?;
        let mut builder = SqlServerScriptBuilder::with_metadata(capture.metadata.clone());
        let mut target = capture.target.clone();
        let actions = self
            .plan(&mut capture.source, &mut target, &mut builder, debug)
            .await?;
        Ok((capture, actions))
    }
}
