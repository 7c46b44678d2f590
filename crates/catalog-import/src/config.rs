//! Configuration management
//!
//! Everything the binary needs besides the command line comes from the
//! environment (optionally seeded from a `.env` file). Command-line flags
//! override these values.

use std::path::PathBuf;
use std::time::Duration;

use catalog_common::{CatalogError, Result};

use crate::db::{DbConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS};
use crate::orchestrator::{DEFAULT_CHUNK_SIZE, DEFAULT_THROTTLE};

// ============================================================================
// Import Configuration Constants
// ============================================================================

/// Default directory for checkpoint and counter blobs
pub const DEFAULT_STATE_DIR: &str = "./storage/import";

/// Default prefix of cache table keys
pub const DEFAULT_CACHE_PREFIX: &str = "catalog_cache:";

/// Importer configuration
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub database: DbConfig,
    pub state_dir: PathBuf,
    pub cache_prefix: String,
    pub throttle: Duration,
    pub chunk_size: usize,
}

impl ImportConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| -> Result<Option<u64>> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| CatalogError::config(format!("{} must be a non-negative integer, got '{}'", key, raw))),
                None => Ok(None),
            }
        };

        let url = lookup("DATABASE_URL")
            .ok_or_else(|| CatalogError::config("DATABASE_URL not set"))?;

        let database = DbConfig {
            url,
            max_connections: narrow("DB_MAX_CONNECTIONS", parsed("DB_MAX_CONNECTIONS")?)?
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            min_connections: narrow("DB_MIN_CONNECTIONS", parsed("DB_MIN_CONNECTIONS")?)?
                .unwrap_or(DEFAULT_MIN_CONNECTIONS),
            connect_timeout_secs: parsed("DB_CONNECT_TIMEOUT")?.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        let config = Self {
            database,
            state_dir: lookup("CATALOG_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            cache_prefix: lookup("CATALOG_CACHE_PREFIX").unwrap_or_else(|| DEFAULT_CACHE_PREFIX.to_string()),
            throttle: parsed("IMPORT_THROTTLE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_THROTTLE),
            chunk_size: narrow("IMPORT_CHUNK_SIZE", parsed("IMPORT_CHUNK_SIZE")?)?
                .unwrap_or(DEFAULT_CHUNK_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;

        if self.chunk_size == 0 {
            return Err(CatalogError::config("IMPORT_CHUNK_SIZE must be greater than 0"));
        }

        if self.state_dir.as_os_str().is_empty() {
            return Err(CatalogError::config("CATALOG_STATE_DIR cannot be empty"));
        }

        Ok(())
    }
}

/// Convert a parsed value to the field's integer type
fn narrow<T: TryFrom<u64>>(key: &str, value: Option<u64>) -> Result<Option<T>> {
    value
        .map(|v| T::try_from(v).map_err(|_| CatalogError::config(format!("{} is out of range, got {}", key, v))))
        .transpose()
}
