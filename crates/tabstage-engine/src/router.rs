//! Message router and engine lifecycle
//!
//! The router owns the staging cache and, once initialization succeeds, the
//! engine handle. Requests are dispatched one at a time to completion.
//!
//! ```text
//! Initializing ──ok──→ Ready
//!      └──────err──→ Failed
//! ```
//!
//! Outside `Ready` every request except `readiness` fails with
//! `EngineUnavailable`; `list-tables` answers an empty list instead.

use std::sync::Arc;

use tabstage_core::Connection;
use tabstage_interchange::list_sheets;

use crate::catalog::CatalogService;
use crate::commit::CommitWriter;
use crate::config::EngineConfig;
use crate::error::{StageError, StageResult};
use crate::export::ExportService;
use crate::identity::IdentityResolver;
use crate::import::{ImportInput, ImportPipeline};
use crate::protocol::{ReadinessState, Request, Response};
use crate::staging::StagingCache;

pub enum EngineState {
    Initializing,
    Ready(Arc<dyn Connection>),
    Failed(String),
}

impl EngineState {
    pub fn readiness(&self) -> ReadinessState {
        match self {
            EngineState::Initializing => ReadinessState::Initializing,
            EngineState::Ready(_) => ReadinessState::Ready,
            EngineState::Failed(_) => ReadinessState::Failed,
        }
    }
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Initializing => write!(f, "Initializing"),
            EngineState::Ready(conn) => write!(f, "Ready({})", conn.driver_name()),
            EngineState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

pub struct MessageRouter {
    state: EngineState,
    staging: StagingCache,
    resolver: IdentityResolver,
    import: ImportPipeline,
    commit: CommitWriter,
    catalog: CatalogService,
    export: ExportService,
}

impl MessageRouter {
    /// A router waiting for its engine handle
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: EngineState::Initializing,
            staging: StagingCache::new(),
            resolver: IdentityResolver::new(config.max_probe_attempts),
            import: ImportPipeline::new(&config),
            commit: CommitWriter::new(&config),
            catalog: CatalogService::new(config.table_preview_rows),
            export: ExportService::new(config.default_separator.clone()),
        }
    }

    /// A router that is ready from the start
    pub fn with_connection(config: EngineConfig, connection: Arc<dyn Connection>) -> Self {
        let mut router = Self::new(config);
        router.mark_ready(connection);
        router
    }

    pub fn mark_ready(&mut self, connection: Arc<dyn Connection>) {
        tracing::info!(driver = connection.driver_name(), "engine ready");
        self.state = EngineState::Ready(connection);
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(reason = %reason, "engine initialization failed");
        self.state = EngineState::Failed(reason);
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn staging(&self) -> &StagingCache {
        &self.staging
    }

    pub fn readiness(&self) -> Response {
        let message = match &self.state {
            EngineState::Failed(reason) => Some(reason.clone()),
            _ => None,
        };
        Response::Readiness {
            state: self.state.readiness(),
            message,
        }
    }

    /// Handle one request to completion.
    ///
    /// The first response answers the request; a second one is an
    /// unsolicited event (the refreshed table list after a drop). Unknown
    /// requests produce nothing.
    #[tracing::instrument(skip_all, fields(request = request.kind()))]
    pub async fn dispatch(&mut self, request: Request) -> Vec<Response> {
        match request {
            Request::Readiness => vec![self.readiness()],
            Request::Unknown => {
                tracing::warn!("ignoring unrecognized request");
                Vec::new()
            }
            Request::ListTables => vec![self.list_tables().await],
            Request::Commit {
                id,
                schema,
                target_name,
            } => {
                let result = match self.connection() {
                    Ok(connection) => {
                        self.commit
                            .commit(
                                connection.as_ref(),
                                &mut self.staging,
                                &id,
                                &schema,
                                target_name.as_deref(),
                            )
                            .await
                    }
                    Err(e) => Err(e),
                };
                match result {
                    Ok(outcome) => vec![Response::committed(outcome)],
                    Err(e) => {
                        log_failure("commit", &e);
                        vec![Response::commit_failed(&e)]
                    }
                }
            }
            Request::DropTable { table } => match self.drop_table(&table).await {
                Ok(names) => {
                    let mut responses = vec![Response::dropped(table)];
                    responses.extend(names.map(|names| Response::Tables { names }));
                    responses
                }
                Err(e) => {
                    log_failure("drop-table", &e);
                    vec![Response::drop_failed(table, &e)]
                }
            },
            other => {
                let kind = other.kind();
                match self.handle(other).await {
                    Ok(response) => vec![response],
                    Err(e) => {
                        log_failure(kind, &e);
                        vec![Response::error(&e)]
                    }
                }
            }
        }
    }

    async fn handle(&mut self, request: Request) -> StageResult<Response> {
        let connection = self.connection()?;
        let connection = connection.as_ref();

        let response = match request {
            Request::Import {
                bytes,
                name,
                rows_to_skip,
                separator,
                format,
                sheet,
            } => {
                let input = ImportInput {
                    bytes,
                    name,
                    rows_to_skip,
                    separator,
                    format,
                    sheet,
                };
                let preview = self
                    .import
                    .import_tabular(input, connection, &mut self.resolver, &mut self.staging)
                    .await?;
                Response::Preview {
                    preview,
                    position: None,
                }
            }
            Request::ListSheets { bytes } => Response::Sheets {
                names: list_sheets(&bytes)?,
            },
            Request::CreateSample { position } => {
                let preview = self
                    .import
                    .create_sample(connection, &mut self.resolver, &mut self.staging)
                    .await?;
                Response::Preview { preview, position }
            }
            Request::Discard { id } => {
                let existed = self.staging.evict(&id);
                Response::Discarded { id, existed }
            }
            Request::ListStaged => Response::Staged {
                datasets: self
                    .staging
                    .list()
                    .map(|d| d.preview(self.import.preview_rows()))
                    .collect(),
            },
            Request::DescribeSchema => Response::Schema {
                entries: self.catalog.describe_schema(connection).await?,
            },
            Request::PreviewTable { table, limit } => self
                .catalog
                .preview_table(connection, &table, limit)
                .await?
                .into(),
            Request::Export => Response::Exported {
                bytes: self.export.export_database(connection).await?,
            },
            Request::ExportTable { table, separator } => {
                let text = self
                    .export
                    .export_table(connection, &self.catalog, &table, separator.as_deref())
                    .await?;
                Response::TableExported { table, text }
            }
            other => {
                return Err(StageError::EngineUnavailable(format!(
                    "'{}' is not routed here",
                    other.kind()
                )));
            }
        };
        Ok(response)
    }

    async fn list_tables(&self) -> Response {
        let EngineState::Ready(connection) = &self.state else {
            return Response::Tables { names: Vec::new() };
        };
        match self.catalog.list_tables(connection.as_ref()).await {
            Ok(names) => Response::Tables { names },
            Err(e) => {
                log_failure("list-tables", &e);
                Response::error(&e)
            }
        }
    }

    /// Drop a table, then read back the table list for the follow-up event
    async fn drop_table(&self, table: &str) -> StageResult<Option<Vec<String>>> {
        let connection = self.connection()?;
        self.catalog.drop_table(connection.as_ref(), table).await?;
        match self.catalog.list_tables(connection.as_ref()).await {
            Ok(names) => Ok(Some(names)),
            Err(e) => {
                tracing::warn!(error = %e, "table list refresh after drop failed");
                Ok(None)
            }
        }
    }

    fn connection(&self) -> StageResult<Arc<dyn Connection>> {
        match &self.state {
            EngineState::Ready(connection) => Ok(Arc::clone(connection)),
            EngineState::Initializing => Err(StageError::EngineUnavailable(
                "engine is still initializing".into(),
            )),
            EngineState::Failed(reason) => Err(StageError::EngineUnavailable(format!(
                "engine failed to initialize: {}",
                reason
            ))),
        }
    }
}

fn log_failure(request: &str, err: &StageError) {
    tracing::warn!(request, kind = ?err.kind(), error = %err, "request failed");
}
