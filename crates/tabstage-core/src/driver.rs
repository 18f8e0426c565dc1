//! Database driver trait definition

use crate::{Connection, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Opens relational engine handles
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Driver identifier (e.g., "sqlite"), matched against `ConnectionConfig::driver`
    fn name(&self) -> &'static str;

    /// Open a connection described by `config`
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open a connection and run a trivial query against it
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        conn.query("SELECT 1", &[]).await?;
        Ok(())
    }
}

/// Connection configuration handed to a `DatabaseDriver`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "sqlite")
    pub driver: String,
    /// Database name or file path
    pub database: Option<String>,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            database: None,
            params: HashMap::new(),
        }
    }

    /// Create a SQLite configuration
    pub fn new_sqlite(database_path: &str) -> Self {
        let mut config = Self::new("sqlite");
        config.database = Some(database_path.to_string());
        config
    }

    /// Set an additional parameter
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Look up a string setting, checking the database field for `path`/`database`
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(value) = self.params.get(key) {
            return Some(value.clone());
        }
        match key {
            "path" | "database" => self.database.clone(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_config_exposes_path() {
        let config = ConnectionConfig::new_sqlite(":memory:");
        assert_eq!(config.driver, "sqlite");
        assert_eq!(config.get_string("path").as_deref(), Some(":memory:"));
        assert_eq!(config.get_string("database").as_deref(), Some(":memory:"));
        assert!(config.get_string("journal_mode").is_none());
    }

    #[test]
    fn params_take_precedence() {
        let config = ConnectionConfig::new_sqlite("a.db").with_param("path", "b.db");
        assert_eq!(config.get_string("path").as_deref(), Some("b.db"));
    }
}
