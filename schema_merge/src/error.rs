//! Error types for schema_merge

use thiserror::Error;

use crate::schema::action::ActionKind;
use crate::schema::types::DbObjectType;

/// Result type for schema_merge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_merge
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Usage error: {0}")]
    UsageError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] tiberius::error::Error),

    #[error("Schema analysis error: {0}")]
    SchemaAnalysisError(String),

    #[error("{action:?} is not supported for {object_type:?} objects")]
    Unsupported {
        action: ActionKind,
        object_type: DbObjectType,
    },

    #[error("Existence check is not supported for {0:?} objects")]
    UnsupportedObjectType(DbObjectType),

    #[error("{0} cannot be scripted without its parent table")]
    MissingParent(String),

    #[error("Unexpected table name format: {0}")]
    InvalidName(String),

    #[error("Model registration error: {0}")]
    ModelRegistrationError(String),

    #[error("Merge aborted: {0}")]
    MergeAborted(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convert Serde JSON errors to schema_merge errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schema_merge errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(error: toml::ser::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
