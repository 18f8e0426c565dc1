//! Error types for engine operations

use thiserror::Error;

/// Error raised by a relational engine handle or driver
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A single parameter set of a bulk statement failed.
    ///
    /// `index` is the 0-based position of the failing parameter set.
    #[error("Row {index} failed: {message}")]
    Row { index: usize, message: String },

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
