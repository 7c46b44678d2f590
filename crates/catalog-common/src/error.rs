//! Error types shared across the catalog workspace

use thiserror::Error;

/// Result type alias for shared catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors raised by shared infrastructure (blob state, configuration)
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blob '{name}' is corrupt: {reason}")]
    CorruptBlob { name: String, reason: String },

    #[error("Invalid blob name: {0}")]
    InvalidBlobName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl CatalogError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a corrupt-blob error for the named entry
    pub fn corrupt_blob(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::CorruptBlob {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
