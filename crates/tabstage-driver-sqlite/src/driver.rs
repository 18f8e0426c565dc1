//! SQLite driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use tabstage_core::{Connection, ConnectionConfig, DatabaseDriver, EngineError, Result};

use crate::{SqliteConnection, SqliteOptions};

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }

    fn options(config: &ConnectionConfig) -> SqliteOptions {
        let mut options = SqliteOptions::default();
        if let Some(mode) = config.get_string("journal_mode") {
            options.journal_mode = if mode.is_empty() { None } else { Some(mode) };
        }
        if let Some(flag) = config.get_string("foreign_keys") {
            options.foreign_keys = !matches!(flag.as_str(), "off" | "OFF" | "false" | "0");
        }
        options
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        if config.driver != self.name() {
            return Err(EngineError::Configuration(format!(
                "configuration is for the '{}' driver, not '{}'",
                config.driver,
                self.name()
            )));
        }
        let path = config.get_string("path").ok_or_else(|| {
            EngineError::Configuration(
                "SQLite requires a 'path' or 'database' parameter, use :memory: for an in-memory store".into(),
            )
        })?;

        let conn = SqliteConnection::open_with_options(&path, &Self::options(config)).map_err(|e| {
            tracing::error!(error = %e, "failed to open SQLite database");
            e
        })?;

        tracing::info!(path = %path, "SQLite connection created");
        Ok(Arc::new(conn))
    }
}
