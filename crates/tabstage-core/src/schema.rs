//! Schema introspection traits and types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Schema introspection interface
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List all user tables, excluding engine-internal tables
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>>;

    /// Get columns for a table, in declaration order
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Check whether a user table exists, ignoring ASCII case
    async fn table_exists(&self, schema: Option<&str>, table: &str) -> Result<bool> {
        let tables = self.list_tables(schema).await?;
        Ok(tables.iter().any(|t| t.name.eq_ignore_ascii_case(table)))
    }
}

/// Table information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
}

/// Column information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type exactly as written in CREATE TABLE
    pub data_type: String,
}
