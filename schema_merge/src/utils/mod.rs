//! Utilities shared by the engine, dialect and CLI

pub mod logging;
pub mod naming;

pub use logging::init_logging;
pub use naming::{format_name, format_thousands, quote_identifier};
