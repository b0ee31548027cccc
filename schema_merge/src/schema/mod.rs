//! Schema module for schema_merge
//!
//! The object model, the comparison engine and the statement builders.

pub mod action;
pub mod analyzer;
pub mod dependency;
pub mod diff;
pub mod generator;
pub mod ignore;
pub mod sqlserver;
pub mod types;

// Re-export key types
pub use action::{ActionKind, ScriptAction, ScriptActionKey, ScriptActions, Statement};
pub use analyzer::{JsonSchemaInspector, SchemaInspector, SqlServerAnalyzer};
pub use generator::{DatabaseMetadata, ScriptBuilder};
pub use ignore::{ActionFilter, IgnoreList};
pub use sqlserver::SqlServerScriptBuilder;
pub use types::{
    CheckConstraint, Column, DbObject, DbObjectType, ForeignKey, ForeignKeyColumn, Index,
    IndexColumn, IndexType, Schema, SortDirection, Table,
};
