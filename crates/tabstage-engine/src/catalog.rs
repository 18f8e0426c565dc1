//! Catalog operations on committed tables
//!
//! Everything here is derived from the live engine on each call; nothing is
//! cached. Engine faults surface as `EngineUnavailable`.

use tabstage_core::{Connection, SchemaIntrospection, Value};

use crate::dataset::{CatalogColumn, CatalogEntry};
use crate::error::{StageError, StageResult};
use crate::sql::{count_sql, drop_table_sql, select_rows_sql};

/// First rows of a committed table, as text
#[derive(Debug, Clone, PartialEq)]
pub struct TablePreview {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Rows in the whole table, not just the preview
    pub row_count: u64,
}

/// Service for table-level catalog operations
pub struct CatalogService {
    default_preview_limit: usize,
}

impl CatalogService {
    /// Create a new catalog service
    ///
    /// # Arguments
    ///
    /// * `default_preview_limit` - Rows returned by `preview_table` when the caller gives no limit
    pub fn new(default_preview_limit: usize) -> Self {
        Self {
            default_preview_limit,
        }
    }

    /// User table names, in engine order
    #[tracing::instrument(skip(self, connection))]
    pub async fn list_tables(&self, connection: &dyn Connection) -> StageResult<Vec<String>> {
        let tables = introspect(connection)?
            .list_tables(None)
            .await
            .map_err(StageError::unavailable)?;
        Ok(tables.into_iter().map(|t| t.name).collect())
    }

    /// Column layout of every user table
    #[tracing::instrument(skip(self, connection))]
    pub async fn describe_schema(&self, connection: &dyn Connection) -> StageResult<Vec<CatalogEntry>> {
        let catalog = introspect(connection)?;
        let tables = catalog
            .list_tables(None)
            .await
            .map_err(StageError::unavailable)?;

        let mut entries = Vec::with_capacity(tables.len());
        for table in tables {
            let columns = catalog
                .get_columns(None, &table.name)
                .await
                .map_err(StageError::unavailable)?
                .into_iter()
                .map(|c| CatalogColumn {
                    name: c.name,
                    data_type: c.data_type,
                })
                .collect();
            entries.push(CatalogEntry {
                table_name: table.name,
                columns,
            });
        }
        Ok(entries)
    }

    /// Drop a table; dropping an absent table succeeds
    #[tracing::instrument(skip(self, connection))]
    pub async fn drop_table(&self, connection: &dyn Connection, table: &str) -> StageResult<()> {
        connection
            .execute(&drop_table_sql(table), &[])
            .await
            .map_err(StageError::unavailable)?;
        tracing::info!(table, "table dropped");
        Ok(())
    }

    /// Authoritative row count of a committed table
    #[tracing::instrument(skip(self, connection))]
    pub async fn row_count(&self, connection: &dyn Connection, table: &str) -> StageResult<u64> {
        self.ensure_exists(connection, table).await?;
        let result = connection
            .query(&count_sql(table), &[])
            .await
            .map_err(StageError::unavailable)?;
        result
            .scalar()
            .and_then(Value::as_i64)
            .map(|n| n as u64)
            .ok_or_else(|| StageError::EngineUnavailable(format!("no row count for '{}'", table)))
    }

    /// First `limit` rows of a committed table in rowid order
    #[tracing::instrument(skip(self, connection))]
    pub async fn preview_table(
        &self,
        connection: &dyn Connection,
        table: &str,
        limit: Option<usize>,
    ) -> StageResult<TablePreview> {
        self.ensure_exists(connection, table).await?;
        let limit = limit.unwrap_or(self.default_preview_limit);
        let result = connection
            .query(&select_rows_sql(table, Some(limit)), &[])
            .await
            .map_err(StageError::unavailable)?;

        let row_count = self.row_count(connection, table).await?;

        Ok(TablePreview {
            table: table.to_string(),
            columns: result.columns.iter().map(|c| c.name.clone()).collect(),
            rows: result
                .rows
                .iter()
                .map(|row| row.values.iter().map(Value::to_text).collect())
                .collect(),
            row_count,
        })
    }

    pub(crate) async fn ensure_exists(&self, connection: &dyn Connection, table: &str) -> StageResult<()> {
        let exists = introspect(connection)?
            .table_exists(None, table)
            .await
            .map_err(StageError::unavailable)?;
        if exists {
            Ok(())
        } else {
            Err(StageError::TableMissing(table.to_string()))
        }
    }
}

pub(crate) fn introspect(connection: &dyn Connection) -> StageResult<&dyn SchemaIntrospection> {
    connection
        .as_schema_introspection()
        .ok_or_else(|| StageError::EngineUnavailable("engine does not expose a catalog".into()))
}
