//! PostgreSQL connection pool

use std::time::Duration;

use catalog_common::{CatalogError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Default maximum connections; the importer writes from one task
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(CatalogError::config("DATABASE_URL cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(CatalogError::config("DB_MAX_CONNECTIONS must be greater than 0"));
        }
        if self.min_connections > self.max_connections {
            return Err(CatalogError::config(format!(
                "DB_MIN_CONNECTIONS ({}) cannot be greater than DB_MAX_CONNECTIONS ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| CatalogError::Database(e.to_string()))?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}
