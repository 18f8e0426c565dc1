//! SQLite connection implementation

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};
use std::sync::Arc;
use tabstage_core::{
    ColumnInfo, ColumnMeta, Connection, EngineError, QueryResult, Result, Row,
    SchemaIntrospection, StatementResult, TableInfo, Transaction, Value,
};

/// Pragmas applied when a database is opened
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// Journal mode to request (`WAL`, `DELETE`, ...). In-memory databases ignore it.
    pub journal_mode: Option<String>,
    /// Whether to enforce foreign keys
    pub foreign_keys: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            journal_mode: Some("WAL".to_string()),
            foreign_keys: true,
        }
    }
}

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
}

impl SqliteConnection {
    /// Open a SQLite database with default options
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_options(path, &SqliteOptions::default())
    }

    /// Open a SQLite database
    pub fn open_with_options(path: &str, options: &SqliteOptions) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let in_memory = path == ":memory:";
        let conn = if in_memory {
            RusqliteConnection::open_in_memory().map_err(|e| {
                EngineError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(EngineError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                EngineError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        let foreign_keys = if options.foreign_keys { "ON" } else { "OFF" };
        conn.pragma_update(None, "foreign_keys", foreign_keys)
            .map_err(|e| EngineError::Connection(format!("Failed to set foreign keys: {}", e)))?;

        if let Some(mode) = options.journal_mode.as_deref()
            && !in_memory
        {
            let applied: String = conn
                .pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))
                .map_err(|e| {
                    EngineError::Connection(format!("Failed to set journal mode: {}", e))
                })?;
            tracing::debug!(requested = %mode, applied = %applied, "journal mode set");
        }

        tracing::info!(path = %expanded_path, "SQLite database connection established");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                let home_path = std::path::PathBuf::from(home);
                home_path.join(rest).to_string_lossy().to_string()
            } else {
                return Err(EngineError::Configuration(
                    "Unable to determine HOME directory".into(),
                ));
            }
        } else if path.starts_with('~') {
            return Err(EngineError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()
                .map_err(EngineError::Io)?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let conn = self.conn.lock();
        run_statement(&conn, sql, params)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let conn = self.conn.lock();
        run_query(&conn, sql, params)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        tracing::debug!("beginning SQLite transaction");
        {
            let conn = self.conn.lock();
            conn.execute_batch("BEGIN DEFERRED").map_err(|e| {
                EngineError::Transaction(format!("Failed to begin transaction: {}", e))
            })?;
        }
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            committed: false,
            rolled_back: false,
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn export_database(&self) -> Result<Vec<u8>> {
        // VACUUM INTO needs a path that does not exist yet.
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("export.sqlite");
        {
            let conn = self.conn.lock();
            let literal = target.to_string_lossy().replace('\'', "''");
            conn.execute_batch(&format!("VACUUM INTO '{}'", literal))
                .map_err(|e| EngineError::Query(format!("Failed to export database: {}", e)))?;
        }
        let bytes = std::fs::read(&target)?;
        tracing::debug!(bytes = bytes.len(), "database exported");
        Ok(bytes)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for SqliteConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<TableInfo>> {
        let result = self
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str()).map(str::to_string))
            .map(|name| TableInfo { name })
            .collect();

        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, _schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        let result = self
            .query(
                "SELECT name, type FROM pragma_table_info(?1) ORDER BY cid",
                &[Value::String(table.to_string())],
            )
            .await?;

        let columns = result
            .rows
            .iter()
            .map(|row| ColumnInfo {
                name: row.get(0).and_then(|v| v.as_str()).unwrap_or("").to_string(),
                data_type: row.get(1).and_then(|v| v.as_str()).unwrap_or("").to_string(),
            })
            .collect();

        Ok(columns)
    }

    async fn table_exists(&self, _schema: Option<&str>, table: &str) -> Result<bool> {
        let result = self
            .query(
                "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' AND name = ?1 COLLATE NOCASE",
                &[Value::String(table.to_string())],
            )
            .await?;
        Ok(result.has_rows())
    }
}

/// SQLite transaction handle
///
/// Holds the shared connection; statements issued through it run inside the
/// `BEGIN` opened by `SqliteConnection::begin_transaction`.
pub struct SqliteTransaction {
    conn: Arc<Mutex<RusqliteConnection>>,
    committed: bool,
    rolled_back: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.committed && !self.rolled_back {
            tracing::warn!(
                "SQLite transaction dropped without commit or rollback, issuing automatic rollback"
            );
            let conn = self.conn.lock();
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %e, "automatic rollback on drop failed");
            }
        }
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing SQLite transaction");

        if self.rolled_back {
            return Err(EngineError::Transaction("Transaction already rolled back".into()));
        }
        if self.committed {
            return Err(EngineError::Transaction("Transaction already committed".into()));
        }

        let conn = self.conn.lock();
        conn.execute_batch("COMMIT").map_err(|e| {
            EngineError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;
        drop(conn);

        self.committed = true;
        tracing::debug!("SQLite transaction committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back SQLite transaction");

        if self.committed {
            return Err(EngineError::Transaction("Transaction already committed".into()));
        }
        if self.rolled_back {
            return Ok(());
        }

        let conn = self.conn.lock();
        conn.execute_batch("ROLLBACK").map_err(|e| {
            EngineError::Transaction(format!("Failed to rollback transaction: {}", e))
        })?;
        drop(conn);

        self.rolled_back = true;
        tracing::debug!("SQLite transaction rolled back");
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let conn = self.conn.lock();
        run_query(&conn, sql, params)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let conn = self.conn.lock();
        run_statement(&conn, sql, params)
    }

    #[tracing::instrument(skip(self, sql, param_sets), fields(sets = param_sets.len()))]
    async fn execute_each(&self, sql: &str, param_sets: &[Vec<Value>]) -> Result<u64> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| EngineError::Query(format!("Failed to prepare statement: {}", e)))?;

        let mut affected = 0u64;
        for (index, params) in param_sets.iter().enumerate() {
            let rusqlite_params = values_to_rusqlite(params);
            // rusqlite resets the statement after every execute, so the
            // cached statement is rebound per parameter set.
            let changed = stmt
                .execute(params_from_iter(rusqlite_params.iter()))
                .map_err(|e| EngineError::Row {
                    index,
                    message: e.to_string(),
                })?;
            affected += changed as u64;
        }

        tracing::debug!(affected_rows = affected, "bulk statement executed");
        Ok(affected)
    }
}

fn run_statement(
    conn: &RusqliteConnection,
    sql: &str,
    params: &[Value],
) -> Result<StatementResult> {
    let rusqlite_params = values_to_rusqlite(params);
    let rows_affected = conn
        .execute(sql, params_from_iter(rusqlite_params.iter()))
        .map_err(|e| EngineError::Query(format!("Failed to execute statement: {}", e)))?;

    tracing::debug!(affected_rows = rows_affected, "statement executed");
    Ok(StatementResult {
        affected_rows: rows_affected as u64,
    })
}

fn run_query(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let start_time = std::time::Instant::now();
    let rusqlite_params = values_to_rusqlite(params);

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| EngineError::Query(format!("Failed to prepare query: {}", e)))?;

    // sqlite3_column_decltype: the type from CREATE TABLE, if any
    let columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .map(|col| ColumnMeta {
            name: col.name().to_string(),
            data_type: col.decl_type().unwrap_or("DYNAMIC").to_string(),
        })
        .collect();

    let mut rows = Vec::new();
    let mut query_rows = stmt
        .query(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| EngineError::Query(format!("Failed to execute query: {}", e)))?;

    while let Some(row) = query_rows
        .next()
        .map_err(|e| EngineError::Query(format!("Failed to fetch row: {}", e)))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(rusqlite_to_value(row, i)?);
        }
        rows.push(Row::new(values));
    }

    tracing::debug!(
        row_count = rows.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "query executed"
    );
    Ok(QueryResult { columns, rows })
}

fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| EngineError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    };

    Ok(value)
}
