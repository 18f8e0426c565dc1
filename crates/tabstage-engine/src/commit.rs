//! Transactional commit of staged datasets
//!
//! A commit turns one staged dataset into one durable table. Row inserts
//! are all-or-nothing: every row is written inside a single transaction
//! through one prepared INSERT, and the staged copy is only evicted once
//! that transaction has committed.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tabstage_core::{Connection, Value};

use crate::catalog::introspect;
use crate::config::{EngineConfig, RollbackPolicy};
use crate::dataset::ColumnSpec;
use crate::error::{StageError, StageResult};
use crate::sql::{count_sql, create_table_sql, drop_table_sql, insert_sql};
use crate::staging::StagingCache;

/// Plain type tags such as `TEXT`, `INTEGER NOT NULL` or `NUMERIC(10, 2)`
static DECLARED_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_ ]*(\(\s*\d+\s*(,\s*\d+\s*)?\))?[A-Za-z0-9_ ]*$")
        .expect("valid regex")
});

/// Caller-chosen table names: identifier characters, not starting with a digit
static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub table_name: String,
    /// Authoritative row count read back from the table
    pub row_count: u64,
}

pub struct CommitWriter {
    rollback_policy: RollbackPolicy,
    strict_tables: bool,
}

impl CommitWriter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            rollback_policy: config.rollback_policy,
            strict_tables: config.strict_tables,
        }
    }

    /// Commit the dataset staged under `id` as table `target_name` (or `id`).
    ///
    /// Checks, in order: the dataset is staged, the schema fits it, an
    /// explicit target is a plain identifier, and neither another staged
    /// dataset nor a table already uses the name. On any failure the staged
    /// copy stays in the cache.
    #[tracing::instrument(skip(self, connection, staging, schema), fields(columns = schema.len()))]
    pub async fn commit(
        &self,
        connection: &dyn Connection,
        staging: &mut StagingCache,
        id: &str,
        schema: &[ColumnSpec],
        target_name: Option<&str>,
    ) -> StageResult<CommitOutcome> {
        let dataset = staging.get(id)?;
        validate_schema(&dataset.headers, schema)?;

        let table = match target_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                validate_table_name(name)?;
                name.to_string()
            }
            None => id.to_string(),
        };

        if staging.name_taken_by_other(&table, id) {
            return Err(StageError::NameCollision(table));
        }
        if introspect(connection)?
            .table_exists(None, &table)
            .await
            .map_err(StageError::unavailable)?
        {
            return Err(StageError::NameCollision(table));
        }

        // Cells are looked up by header position, bound in schema order.
        let param_sets: Vec<Vec<Value>> = dataset
            .rows
            .iter()
            .map(|record| {
                dataset
                    .headers
                    .iter()
                    .map(|header| Value::from(record.get(header).cloned().flatten()))
                    .collect()
            })
            .collect();

        connection
            .execute(&create_table_sql(&table, schema, self.strict_tables), &[])
            .await
            .map_err(StageError::transaction)?;
        tracing::debug!(table = %table, "table created");

        let inserted = if param_sets.is_empty() {
            0
        } else {
            self.insert_all(connection, &table, schema, &param_sets)
                .await?
        };

        staging.evict(id);

        let row_count = match connection.query(&count_sql(&table), &[]).await {
            Ok(result) => result
                .scalar()
                .and_then(Value::as_i64)
                .map(|n| n as u64)
                .unwrap_or(inserted),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "row count failed, using inserted count");
                inserted
            }
        };

        tracing::info!(table = %table, rows = row_count, "dataset committed");
        Ok(CommitOutcome {
            table_name: table,
            row_count,
        })
    }

    async fn insert_all(
        &self,
        connection: &dyn Connection,
        table: &str,
        schema: &[ColumnSpec],
        param_sets: &[Vec<Value>],
    ) -> StageResult<u64> {
        let tx = match connection.begin_transaction().await {
            Ok(tx) => tx,
            Err(e) => {
                self.discard_table(connection, table).await;
                return Err(StageError::transaction(e));
            }
        };

        let inserted = match tx.execute_each(&insert_sql(table, schema), param_sets).await {
            Ok(inserted) => inserted,
            Err(e) => {
                tracing::warn!(table, error = %e, "row insert failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(table, error = %rollback_err, "rollback failed");
                }
                self.discard_table(connection, table).await;
                return Err(StageError::transaction(e));
            }
        };

        if let Err(e) = tx.commit().await {
            self.discard_table(connection, table).await;
            return Err(StageError::transaction(e));
        }
        Ok(inserted)
    }

    /// Apply the rollback policy to a table whose rows did not commit
    async fn discard_table(&self, connection: &dyn Connection, table: &str) {
        match self.rollback_policy {
            RollbackPolicy::KeepEmptyTable => {
                tracing::debug!(table, "keeping empty table after rollback");
            }
            RollbackPolicy::DropTable => {
                if let Err(e) = connection.execute(&drop_table_sql(table), &[]).await {
                    tracing::warn!(table, error = %e, "failed to drop table after rollback");
                }
            }
        }
    }
}

/// Check a caller-chosen table name before it reaches any DDL
pub fn validate_table_name(name: &str) -> StageResult<()> {
    if !TABLE_NAME.is_match(name) {
        return Err(StageError::InvalidSchema(format!(
            "table name '{}' must use letters, digits and '_' and not start with a digit",
            name
        )));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(StageError::InvalidSchema(format!(
            "table name '{}' uses the reserved 'sqlite_' prefix",
            name
        )));
    }
    Ok(())
}

/// Check a caller schema against the staged headers
pub fn validate_schema(headers: &[String], schema: &[ColumnSpec]) -> StageResult<()> {
    if schema.len() != headers.len() {
        return Err(StageError::InvalidSchema(format!(
            "schema has {} column(s) but the dataset has {}",
            schema.len(),
            headers.len()
        )));
    }

    let mut seen = HashSet::with_capacity(schema.len());
    for (position, column) in schema.iter().enumerate() {
        let name = column.name.trim();
        if name.is_empty() {
            return Err(StageError::InvalidSchema(format!(
                "column {} has an empty name",
                position + 1
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(StageError::InvalidSchema(format!(
                "duplicate column name '{}'",
                name
            )));
        }
        if !DECLARED_TYPE.is_match(column.declared_type.trim()) {
            return Err(StageError::InvalidSchema(format!(
                "column '{}' has an unsupported type '{}'",
                name, column.declared_type
            )));
        }
    }
    Ok(())
}
