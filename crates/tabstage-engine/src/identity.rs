//! Unique dataset identities
//!
//! Staged ids double as default table names, so an id must be free both in
//! the staging cache and in the engine catalog. Names are compared without
//! regard to ASCII case, the way SQLite compares table names.

use std::time::{SystemTime, UNIX_EPOCH};

use tabstage_core::Connection;

use crate::config::IdentityStrategy;
use crate::staging::StagingCache;

/// A resolved id and the tick it was resolved at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub id: String,
    /// Also the suffix of a timestamp id
    pub tick: u64,
}

/// Derives unique ids from requested base names
#[derive(Debug)]
pub struct IdentityResolver {
    max_probe_attempts: usize,
    last_tick: u64,
}

impl IdentityResolver {
    pub fn new(max_probe_attempts: usize) -> Self {
        Self {
            max_probe_attempts: max_probe_attempts.max(1),
            last_tick: 0,
        }
    }

    /// Wall-clock microseconds, forced strictly increasing across calls
    pub fn tick(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        self.last_tick = now.max(self.last_tick + 1);
        self.last_tick
    }

    /// Resolve `requested` to an id that is neither staged nor a table.
    ///
    /// The probe strategy falls back to a timestamp id when the catalog
    /// cannot be consulted or every probe candidate is taken. One tick is
    /// taken per call.
    #[tracing::instrument(skip(self, connection, staging))]
    pub async fn resolve(
        &mut self,
        requested: &str,
        strategy: IdentityStrategy,
        connection: &dyn Connection,
        staging: &StagingCache,
    ) -> ResolvedId {
        let base = sanitize_base_name(requested);
        let tick = self.tick();
        let id = match strategy {
            IdentityStrategy::Timestamp => None,
            IdentityStrategy::Probe => self.probe(&base, connection, staging).await,
        };
        ResolvedId {
            id: id.unwrap_or_else(|| format!("{}_{}", base, tick)),
            tick,
        }
    }

    async fn probe(
        &self,
        base: &str,
        connection: &dyn Connection,
        staging: &StagingCache,
    ) -> Option<String> {
        let Some(catalog) = connection.as_schema_introspection() else {
            tracing::warn!(base, "catalog not available for probing, using timestamp id");
            return None;
        };

        for attempt in 0..self.max_probe_attempts {
            let candidate = if attempt == 0 {
                base.to_string()
            } else {
                format!("{}_{}", base, attempt)
            };
            if staging.contains_ignore_case(&candidate) {
                continue;
            }
            match catalog.table_exists(None, &candidate).await {
                Ok(false) => return Some(candidate),
                Ok(true) => continue,
                Err(e) => {
                    tracing::warn!(base, error = %e, "catalog probe failed, using timestamp id");
                    return None;
                }
            }
        }

        tracing::warn!(
            base,
            attempts = self.max_probe_attempts,
            "probe attempts exhausted, using timestamp id"
        );
        None
    }
}

/// Reduce a requested name to identifier-safe text.
///
/// Drops a file extension, replaces anything outside `[A-Za-z0-9_]` with
/// `_`, and prefixes names starting with a digit or the reserved `sqlite_`
/// with `t_`. An empty result becomes `dataset`.
pub fn sanitize_base_name(requested: &str) -> String {
    let trimmed = requested.trim();
    let stem = match trimmed.rfind('.') {
        Some(pos) if pos > 0 => &trimmed[..pos],
        _ => trimmed,
    };

    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        return "dataset".to_string();
    }
    let reserved = cleaned.to_ascii_lowercase().starts_with("sqlite_");
    if reserved || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("t_{}", cleaned)
    } else {
        cleaned
    }
}
