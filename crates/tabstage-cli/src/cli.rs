//! `tabstage`: hosts the staging engine behind a JSON-lines stdio protocol
//!
//! Each stdin line is one request envelope; each stdout line is one
//! response or event. Logs go to stderr and the log directory.

mod logging;
mod stdio;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tabstage_core::{ConnectionConfig, DatabaseDriver};
use tabstage_driver_sqlite::SqliteDriver;
use tabstage_engine::{EngineConfig, RollbackPolicy, spawn};
use tokio::io::BufReader;

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogProfile {
    Development,
    Production,
    Testing,
}

#[derive(Debug, Parser)]
#[command(name = "tabstage", version, about = "Staged tabular import and commit engine")]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, env = "TABSTAGE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path, `:memory:` for a throwaway store
    #[arg(long, env = "TABSTAGE_DATABASE")]
    database: Option<String>,

    /// Create committed tables as STRICT
    #[arg(long)]
    strict_tables: bool,

    /// Drop a newly created table when its rows fail to commit
    #[arg(long)]
    drop_on_rollback: bool,

    /// Logging preset
    #[arg(long, value_enum, default_value = "production", env = "TABSTAGE_LOG_PROFILE")]
    log_profile: LogProfile,

    /// Directory for JSON log files
    #[arg(long, env = "TABSTAGE_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        let mut config = match self.log_profile {
            LogProfile::Development => LoggingConfig::development(),
            LogProfile::Production => LoggingConfig::production(),
            LogProfile::Testing => LoggingConfig::testing(),
        };
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        config
    }

    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load_from(path)?,
            None => EngineConfig::load()?,
        };
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if self.strict_tables {
            config.strict_tables = true;
        }
        if self.drop_on_rollback {
            config.rollback_policy = RollbackPolicy::DropTable;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.logging_config()).context("Failed to initialize logging")?;

    let config = cli.engine_config().context("Failed to load configuration")?;
    tracing::info!(
        database = %config.database_path,
        strict_tables = config.strict_tables,
        rollback_policy = ?config.rollback_policy,
        "starting engine"
    );

    let connection_config = ConnectionConfig::new_sqlite(&config.database_path)
        .with_param("journal_mode", config.journal_mode.clone());
    let handle = spawn(config, async move {
        SqliteDriver::new().connect(&connection_config).await
    });

    let stdin = BufReader::new(tokio::io::stdin());
    stdio::serve(handle, stdin, tokio::io::stdout()).await?;

    tracing::info!("engine shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_config() {
        let dir = std::env::temp_dir().join("tabstage-cli-test-absent");
        let cli = Cli::parse_from([
            "tabstage",
            "--config",
            dir.join("none.toml").to_str().unwrap(),
            "--database",
            "/tmp/staged.sqlite",
            "--strict-tables",
            "--drop-on-rollback",
        ]);
        let config = cli.engine_config().unwrap();
        assert_eq!(config.database_path, "/tmp/staged.sqlite");
        assert!(config.strict_tables);
        assert_eq!(config.rollback_policy, RollbackPolicy::DropTable);
    }

    #[test]
    fn log_dir_override_applies_to_any_profile() {
        let cli = Cli::parse_from(["tabstage", "--log-profile", "testing", "--log-dir", "/tmp/x"]);
        let config = cli.logging_config();
        assert_eq!(config.log_dir, PathBuf::from("/tmp/x"));
        assert!(!config.enable_json_logs);
    }
}
