//! Configuration handling for schema_merge

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "schema-merge.toml";
/// Default ignore file name
pub const DEFAULT_IGNORE_FILE: &str = "schema-merge.ignore.json";

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Write a starter configuration to `path`
pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(Error::ConfigError(format!(
            "{} already exists",
            path.display()
        )));
    }

    fs::write(path, toml::to_string_pretty(&Config::example())?)?;
    tracing::info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

/// Represents the complete schema_merge configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// JSON schema file used as the source when none is named on the command line
    pub source: Option<String>,
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub script: ScriptConfig,
    pub logging: Option<LoggingConfig>,
}

fn default_ignore_file() -> String {
    DEFAULT_IGNORE_FILE.to_string()
}

impl Config {
    /// Look up a target by name, or the first target when no name is given
    pub fn target(&self, name: Option<&str>) -> Result<&TargetConfig> {
        match name {
            Some(name) => self
                .targets
                .iter()
                .find(|target| target.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::ConfigError(format!("Unknown target '{}'", name))),
            None => self
                .targets
                .first()
                .ok_or_else(|| Error::ConfigError("No targets configured".to_string())),
        }
    }

    fn example() -> Self {
        Self {
            source: Some("schema.json".to_string()),
            ignore_file: default_ignore_file(),
            targets: vec![TargetConfig {
                name: "local".to_string(),
                connection_string: "Server=localhost,1433;Database=Demo;User Id=sa;Password=changeme;TrustServerCertificate=true".to_string(),
                is_production: false,
            }],
            script: ScriptConfig::default(),
            logging: Some(LoggingConfig::default()),
        }
    }
}

/// A database the merge can be aimed at
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TargetConfig {
    pub name: String,
    pub connection_string: String,
    /// Production targets require typing the database name before a merge
    #[serde(default)]
    pub is_production: bool,
}

impl TargetConfig {
    /// Database name from the `Database=` or `Initial Catalog=` key
    pub fn database_name(&self) -> Option<String> {
        let pattern = Regex::new(r"(?i)(?:^|;)\s*(?:database|initial catalog)\s*=\s*([^;]+)").ok()?;
        pattern
            .captures(&self.connection_string)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

/// Script output settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScriptConfig {
    pub separator: String,
    pub output: String,
    pub allow_destructive: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            separator: "\nGO\n".to_string(),
            output: "script.sql".to_string(),
            allow_destructive: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
source = "model.json"
ignore_file = "ignore.json"

[[targets]]
name = "local"
connection_string = "Server=localhost;Database=Demo;User Id=sa"

[[targets]]
name = "prod"
connection_string = "Server=db01;Initial Catalog = Payroll ;Integrated Security=true"
is_production = true

[script]
allow_destructive = true

[logging]
level = "debug"
format = "json"
"#;

    #[test]
    fn parses_targets_and_fills_defaults() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.source.as_deref(), Some("model.json"));
        assert_eq!(config.targets.len(), 2);
        assert!(!config.targets[0].is_production);
        assert!(config.targets[1].is_production);
        assert_eq!(config.script.separator, "\nGO\n");
        assert_eq!(config.script.output, "script.sql");
        assert!(config.script.allow_destructive);

        let logging = config.logging.unwrap();
        assert_eq!(logging.level, "debug");
        assert!(logging.stdout);
    }

    #[rstest]
    #[case(None, "local")]
    #[case(Some("PROD"), "prod")]
    fn selects_targets(#[case] name: Option<&str>, #[case] expected: &str) {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.target(name).unwrap().name, expected);
    }

    #[test]
    fn unknown_target_is_a_config_error() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert!(matches!(config.target(Some("qa")), Err(Error::ConfigError(_))));
    }

    #[test]
    fn reads_database_name_from_connection_string() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.targets[0].database_name().as_deref(), Some("Demo"));
        assert_eq!(config.targets[1].database_name().as_deref(), Some("Payroll"));

        let bare = TargetConfig {
            name: "x".to_string(),
            connection_string: "Server=localhost".to_string(),
            is_production: false,
        };
        assert_eq!(bare.database_name(), None);
    }

    #[test]
    fn default_config_round_trips_and_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        write_default(&path).unwrap();
        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded, Config::example());

        assert!(matches!(write_default(&path), Err(Error::ConfigError(_))));
    }
}
