//! Tabstage engine
//!
//! Stages parsed tabular files as in-memory datasets and commits them into
//! an embedded relational store, one atomic transaction per dataset.
//!
//! # Architecture
//!
//! ```text
//! Envelope ─→ worker ─→ MessageRouter ─┬─ ImportPipeline ─→ IdentityResolver ─→ StagingCache
//!                                      ├─ CommitWriter   ─→ Connection (transaction)
//!                                      ├─ CatalogService ─→ SchemaIntrospection
//!                                      └─ ExportService  ─→ Connection::export_database
//! ```
//!
//! The router is usable directly (`MessageRouter::dispatch`) or hosted on a
//! background task via [`worker::spawn`].

pub mod catalog;
pub mod commit;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod identity;
pub mod import;
pub mod protocol;
pub mod router;
pub mod sql;
pub mod staging;
pub mod worker;

pub use catalog::{CatalogService, TablePreview};
pub use commit::{CommitOutcome, CommitWriter, validate_schema, validate_table_name};
pub use config::{EngineConfig, IdentityStrategy, RollbackPolicy};
pub use dataset::{CatalogColumn, CatalogEntry, ColumnSpec, PreviewRecord, StagedDataset};
pub use error::{ErrorKind, StageError, StageResult};
pub use export::ExportService;
pub use identity::{IdentityResolver, ResolvedId, sanitize_base_name};
pub use import::{ImportFormat, ImportInput, ImportPipeline};
pub use protocol::{Envelope, Outbound, ReadinessState, Request, Response};
pub use router::{EngineState, MessageRouter};
pub use staging::StagingCache;
pub use worker::{WorkerHandle, spawn};
