use serde::{Deserialize, Serialize};
use tabstage_core::EngineError;
use tabstage_interchange::TabularError;
use thiserror::Error;

pub type StageResult<T> = Result<T, StageError>;

/// Failure kinds visible to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Engine still initializing or failed; retry after readiness
    EngineUnavailable,
    /// Input could not be parsed
    ParseError,
    /// Target name belongs to a table or another staged dataset; staged data kept
    NameCollision,
    /// Nothing staged under the id
    DatasetMissing,
    /// Writes rolled back; staged data kept
    TransactionFailure,
    /// Caller schema does not match the staged dataset
    InvalidSchema,
}

/// Engine errors with user-facing messages
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Parse error: {0}")]
    Parse(#[from] TabularError),

    #[error("Name '{0}' is already used by a table or a staged dataset")]
    NameCollision(String),

    #[error("No staged dataset with id '{0}'")]
    DatasetMissing(String),

    /// Reported with the `DatasetMissing` kind
    #[error("No table named '{0}'")]
    TableMissing(String),

    #[error("Transaction failed{}: {message}", .row.map(|r| format!(" at row {}", r)).unwrap_or_default())]
    TransactionFailure { row: Option<usize>, message: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            StageError::Parse(_) => ErrorKind::ParseError,
            StageError::NameCollision(_) => ErrorKind::NameCollision,
            StageError::DatasetMissing(_) | StageError::TableMissing(_) => ErrorKind::DatasetMissing,
            StageError::TransactionFailure { .. } => ErrorKind::TransactionFailure,
            StageError::InvalidSchema(_) => ErrorKind::InvalidSchema,
        }
    }

    /// Engine fault during a write path (create, insert, commit)
    pub fn transaction(err: EngineError) -> Self {
        match err {
            EngineError::Row { index, message } => StageError::TransactionFailure {
                row: Some(index),
                message,
            },
            other => StageError::TransactionFailure {
                row: None,
                message: other.to_string(),
            },
        }
    }

    /// Engine fault during a read path (catalog, export)
    pub fn unavailable(err: EngineError) -> Self {
        StageError::EngineUnavailable(err.to_string())
    }
}
