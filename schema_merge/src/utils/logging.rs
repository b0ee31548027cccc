//! Logging setup
//!
//! Installs a global `tracing` subscriber from the optional `[logging]` table.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn install<S>(subscriber: S) -> Result<()>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::ConfigError(format!("Failed to install logger: {}", e)))
}

/// Initialize logging based on configuration
///
/// `RUST_LOG` is honoured; the configured level is added as a `schema_merge` directive.
/// Without a `[logging]` table nothing is installed.
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()),
    };

    let directive = format!("schema_merge={}", parse_level(&config.level))
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log level: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(file_path)?;
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file));

        if json {
            install(builder.json().finish())
        } else {
            install(builder.finish())
        }
    } else if config.stdout {
        let builder = fmt::Subscriber::builder().with_env_filter(env_filter);

        if json {
            install(builder.json().finish())
        } else {
            install(builder.finish())
        }
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TRACE", Level::TRACE)]
    #[case("debug", Level::DEBUG)]
    #[case("warn", Level::WARN)]
    #[case("verbose", Level::INFO)]
    fn test_parse_level(#[case] input: &str, #[case] expected: Level) {
        assert_eq!(parse_level(input), expected);
    }

    #[test]
    fn missing_logging_table_installs_nothing() {
        assert!(init_logging(&None).is_ok());
    }
}
