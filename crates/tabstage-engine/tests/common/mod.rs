//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tabstage_core::{
    ColumnInfo, Connection, EngineError, QueryResult, Result, Row, SchemaIntrospection,
    StatementResult, TableInfo, Transaction, Value,
};
use tabstage_driver_sqlite::SqliteConnection;
use tabstage_engine::{Envelope, EngineConfig, MessageRouter, Request, Response};

/// Mock engine handle for exercising failure paths a real database will not
/// produce on demand.
///
/// Every statement is recorded in `log`; transaction calls are recorded as
/// `BEGIN`, `COMMIT` and `ROLLBACK`.
pub struct MockConnection {
    pub tables: Vec<String>,
    pub catalog_fails: bool,
    pub count_fails: bool,
    /// Index of the parameter set whose insert fails
    pub fail_row: Option<usize>,
    pub log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            catalog_fails: false,
            count_fails: false,
            fail_row: None,
            log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_tables(mut self, tables: &[&str]) -> Self {
        self.tables = tables.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_catalog_failure(mut self) -> Self {
        self.catalog_fails = true;
        self
    }

    pub fn with_count_failure(mut self) -> Self {
        self.count_fails = true;
        self
    }

    pub fn failing_at_row(mut self, row: usize) -> Self {
        self.fail_row = Some(row);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.log.lock().push(sql.to_string());
        Ok(StatementResult { affected_rows: 0 })
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.log.lock().push(sql.to_string());
        if self.count_fails && sql.starts_with("SELECT COUNT(*)") {
            return Err(EngineError::Query("database is locked".into()));
        }
        let mut result = QueryResult::empty();
        result.rows.push(Row::new(vec![Value::Int64(0)]));
        Ok(result)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        self.log.lock().push("BEGIN".into());
        Ok(Box::new(MockTransaction {
            fail_row: self.fail_row,
            log: Arc::clone(&self.log),
        }))
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for MockConnection {
    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<TableInfo>> {
        if self.catalog_fails {
            return Err(EngineError::Connection("engine handle lost".into()));
        }
        Ok(self
            .tables
            .iter()
            .map(|name| TableInfo { name: name.clone() })
            .collect())
    }

    async fn get_columns(&self, _schema: Option<&str>, _table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(Vec::new())
    }
}

pub struct MockTransaction {
    fail_row: Option<usize>,
    log: Arc<parking_lot::Mutex<Vec<String>>>,
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.log.lock().push("COMMIT".into());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.log.lock().push("ROLLBACK".into());
        Ok(())
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Ok(QueryResult::empty())
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.log.lock().push(sql.to_string());
        Ok(StatementResult { affected_rows: 1 })
    }

    async fn execute_each(&self, sql: &str, param_sets: &[Vec<Value>]) -> Result<u64> {
        self.log.lock().push(sql.to_string());
        match self.fail_row {
            Some(index) if index < param_sets.len() => Err(EngineError::Row {
                index,
                message: "constraint failed".into(),
            }),
            _ => Ok(param_sets.len() as u64),
        }
    }
}

/// A router on a fresh in-memory SQLite database
pub fn sqlite_router(config: EngineConfig) -> MessageRouter {
    let conn = SqliteConnection::open(":memory:").expect("in-memory database");
    MessageRouter::with_connection(config, Arc::new(conn))
}

pub fn csv_import(text: &str, name: &str) -> Request {
    tabstage_engine::ImportInput::delimited(text, name).into()
}

/// Dispatch a request that must produce exactly one response
pub async fn single(router: &mut MessageRouter, request: Request) -> Response {
    let mut responses = router.dispatch(request).await;
    assert_eq!(responses.len(), 1, "expected one response, got {responses:?}");
    responses.remove(0)
}

pub fn envelope(correlation_id: u64, request: Request) -> Envelope {
    Envelope::new(request).with_correlation_id(correlation_id)
}
