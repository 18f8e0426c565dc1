//! Whole-store and single-table export

use tabstage_core::{Connection, Value};
use tabstage_interchange::{parse_separator, write_delimited};

use crate::catalog::CatalogService;
use crate::error::{StageError, StageResult};
use crate::sql::select_rows_sql;

pub struct ExportService {
    default_separator: String,
}

impl ExportService {
    pub fn new(default_separator: impl Into<String>) -> Self {
        Self {
            default_separator: default_separator.into(),
        }
    }

    /// Snapshot of every committed table as a SQLite database image.
    ///
    /// Staged datasets are not part of the image.
    #[tracing::instrument(skip(self, connection))]
    pub async fn export_database(&self, connection: &dyn Connection) -> StageResult<Vec<u8>> {
        let bytes = connection
            .export_database()
            .await
            .map_err(StageError::unavailable)?;
        tracing::info!(bytes = bytes.len(), "database exported");
        Ok(bytes)
    }

    /// One committed table as delimited text with a header row.
    ///
    /// NULL cells are written as empty fields.
    #[tracing::instrument(skip(self, connection, catalog))]
    pub async fn export_table(
        &self,
        connection: &dyn Connection,
        catalog: &CatalogService,
        table: &str,
        separator: Option<&str>,
    ) -> StageResult<String> {
        let delimiter = parse_separator(separator.unwrap_or(&self.default_separator))?;
        catalog.ensure_exists(connection, table).await?;

        let result = connection
            .query(&select_rows_sql(table, None), &[])
            .await
            .map_err(StageError::unavailable)?;

        let headers: Vec<String> = result.columns.iter().map(|c| c.name.clone()).collect();
        let rows = result
            .rows
            .iter()
            .map(|row| row.values.iter().map(Value::to_text).collect::<Vec<_>>());
        let text = render(&headers, rows, delimiter)?;

        tracing::debug!(table, rows = result.rows.len(), "table exported");
        Ok(text)
    }
}

/// Serialize rows read back from the engine.
///
/// A failure here means the engine returned rows the writer cannot encode,
/// not that the caller sent bad input.
fn render<I>(headers: &[String], rows: I, delimiter: u8) -> StageResult<String>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    write_delimited(headers, rows, delimiter).map_err(|e| StageError::EngineUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn renders_nulls_as_empty_fields() {
        let headers = vec!["region".to_string(), "units".to_string()];
        let text = render(&headers, vec![vec![Some("north".into()), None]], b',').unwrap();
        assert_eq!(text, "region,units\nnorth,\n");
    }

    #[test]
    fn write_faults_are_engine_faults() {
        let headers = vec!["region".to_string(), "units".to_string()];
        let err = render(&headers, vec![vec![Some("north".into())]], b',').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
    }
}
