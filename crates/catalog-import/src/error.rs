//! Import error types
//!
//! Row-level problems ([`NormalizeError`]) never abort a run; they are counted
//! as skipped. Everything in [`ImportError`] is run-level and fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for import operations
pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Run-level failures
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Cannot read input file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file {} has no header row", .0.display())]
    EmptyInput(PathBuf),

    #[error("Malformed input at line {line}: {source}")]
    Tokenize {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid import options: {0}")]
    InvalidOptions(String),

    #[error("Catalog write failed: {0}")]
    Write(#[from] WriteError),

    #[error("Progress state error: {0}")]
    Progress(#[from] catalog_common::CatalogError),
}

impl ImportError {
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions(message.into())
    }

    /// Whether the process should report a missing/unreadable input file
    pub fn is_input_error(&self) -> bool {
        matches!(self, ImportError::Io { .. } | ImportError::EmptyInput(_))
    }
}

/// Row-level failures raised by the normalizer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Column count mismatch: header has {expected} columns, row has {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Row has no product code")]
    MissingCode,
}

/// Catalog or cache store failures
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store rejected batch: {0}")]
    Rejected(String),
}
