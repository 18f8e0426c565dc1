//! Engine configuration
//!
//! Loaded from `<config dir>/tabstage/config.toml`; every field is optional
//! in the file and falls back to the defaults below.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the identity resolver derives a unique name from a base name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityStrategy {
    /// `base`, then `base_1`, `base_2`, ... until free
    Probe,
    /// `base_<monotonic micros>`
    Timestamp,
}

/// What happens to a freshly created table when its row inserts roll back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollbackPolicy {
    /// Leave the empty table in place
    #[default]
    KeepEmptyTable,
    /// Drop the table so the name stays free for a retry
    DropTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path of the SQLite database, `:memory:` for a throwaway store
    pub database_path: String,
    /// SQLite journal mode for file databases; empty to leave the default
    pub journal_mode: String,
    /// Rows included in a staged preview
    pub preview_rows: usize,
    /// Capacity of the worker's inbound request queue
    pub queue_capacity: usize,
    /// Strategy used by `import`
    pub import_identity: IdentityStrategy,
    /// Strategy used by `create-sample`
    pub sample_identity: IdentityStrategy,
    /// Upper bound on probe candidates before falling back to timestamps
    pub max_probe_attempts: usize,
    pub rollback_policy: RollbackPolicy,
    /// Create committed tables as `STRICT`
    pub strict_tables: bool,
    /// Separator used when a request does not name one
    pub default_separator: String,
    /// Rows returned by `preview-table` when no limit is given
    pub table_preview_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: ":memory:".to_string(),
            journal_mode: "WAL".to_string(),
            preview_rows: 5,
            queue_capacity: 64,
            import_identity: IdentityStrategy::Probe,
            sample_identity: IdentityStrategy::Timestamp,
            max_probe_attempts: 1000,
            rollback_policy: RollbackPolicy::KeepEmptyTable,
            strict_tables: false,
            default_separator: ",".to_string(),
            table_preview_rows: 50,
        }
    }
}

impl EngineConfig {
    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join("tabstage").join("config.toml"))
    }

    /// Load from the default location, or defaults when the file is absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            preview_rows = 3
            rollback_policy = "drop-table"
            import_identity = "timestamp"
            "#,
        )
        .unwrap();
        assert_eq!(config.preview_rows, 3);
        assert_eq!(config.rollback_policy, RollbackPolicy::DropTable);
        assert_eq!(config.import_identity, IdentityStrategy::Timestamp);
        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.sample_identity, IdentityStrategy::Timestamp);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.preview_rows, 5);
        assert!(!config.strict_tables);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "preview_rows = \"many\"").unwrap();
        assert!(EngineConfig::load_from(&path).is_err());
    }
}
