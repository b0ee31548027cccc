//! Database connection handling
//!
//! This module opens SQL Server connections from ADO.NET-style connection strings.

use tiberius::{Client, Config, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::error::{Error, Result};

/// A single open SQL Server connection
pub struct DatabaseConnection {
    client: Client<Compat<TcpStream>>,
}

impl DatabaseConnection {
    /// Connect using a connection string such as
    /// `Server=localhost,1433;Database=Demo;User Id=sa;Password=...`
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config = Config::from_ado_string(connection_string)?;

        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write()).await?;
        tracing::debug!("Connected to SQL Server");

        Ok(Self { client })
    }

    /// Run a query and collect the rows of its first result set
    pub async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let stream = self.client.simple_query(sql).await?;
        Ok(stream.into_first_result().await?)
    }

    /// Run a statement batch, discarding any results
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        let stream = self.client.simple_query(sql).await?;
        stream.into_results().await?;
        Ok(())
    }

    /// Read the first column of every row as a string
    pub async fn query_strings(&mut self, sql: &str) -> Result<Vec<String>> {
        let rows = self.query(sql).await?;
        rows.iter().map(|row| required_str(row, 0)).collect()
    }
}

/// Non-null string column
pub fn required_str(row: &Row, index: usize) -> Result<String> {
    row.try_get::<&str, _>(index)?
        .map(str::to_string)
        .ok_or_else(|| Error::SchemaAnalysisError(format!("Unexpected NULL in column {}", index)))
}

/// Nullable string column
pub fn optional_str(row: &Row, index: usize) -> Result<Option<String>> {
    Ok(row.try_get::<&str, _>(index)?.map(str::to_string))
}

/// Non-null int column
pub fn required_i32(row: &Row, index: usize) -> Result<i32> {
    row.try_get::<i32, _>(index)?
        .ok_or_else(|| Error::SchemaAnalysisError(format!("Unexpected NULL in column {}", index)))
}

pub fn required_bool(row: &Row, index: usize) -> Result<bool> {
    Ok(row.try_get::<bool, _>(index)?.unwrap_or(false))
}
