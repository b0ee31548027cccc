//! Database module for schema_merge
//!
//! This module handles SQL Server connections, the metadata snapshot query and
//! transactional execution of generated scripts.

pub mod connection;
pub mod executor;

// Re-export key types
pub use connection::DatabaseConnection;
pub use executor::SqlExecutor;
