//! Connection trait and transaction handling

use crate::{QueryResult, Result, SchemaIntrospection, StatementResult, Value};
use async_trait::async_trait;

/// A handle to an embedded relational engine
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite")
    fn driver_name(&self) -> &str;

    /// Execute a statement that does not return rows (DDL, INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT, PRAGMA)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;

    /// Serialize the entire database to an opaque byte image.
    ///
    /// Drivers that cannot produce an image return `NotSupported`.
    async fn export_database(&self) -> Result<Vec<u8>> {
        Err(crate::EngineError::NotSupported(format!(
            "database export is not supported by the {} driver",
            self.driver_name()
        )))
    }

    /// Get schema introspection interface if supported
    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        None
    }
}

/// A database transaction
///
/// Dropping a transaction without calling `commit` or `rollback` must leave
/// the connection rolled back.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a query within the transaction
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a statement within the transaction
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Prepare `sql` once and execute it for every parameter set, in order.
    ///
    /// The statement is bound, stepped and reset per parameter set. Stops at
    /// the first failure and reports it as `EngineError::Row` with the
    /// 0-based index of the failing set; the transaction is left open so the
    /// caller decides how to roll back. Returns the total affected row count.
    async fn execute_each(&self, sql: &str, param_sets: &[Vec<Value>]) -> Result<u64>;
}
