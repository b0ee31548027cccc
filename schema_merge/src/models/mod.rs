//! Models module for schema_merge
//!
//! Rust structs as the source side of a comparison.

pub mod registry;

pub use registry::{map_type_to_db_type, FieldDefinition, ModelDefinition, ModelRegistry, SchemaModel};
