//! Catalog and cache store interfaces
//!
//! The importer only needs two things from the outside world: an idempotent
//! "upsert by code" for catalog rows and "forget these keys" for the result
//! cache. PostgreSQL implementations live in [`postgres`]; [`memory`] holds
//! process-local stores for dry runs and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::WriteError;
use crate::models::CatalogRecord;

pub use memory::{MemoryCacheStore, MemoryCatalogStore, NoopCacheStore};
pub use postgres::{PgCacheStore, PgCatalogStore};

/// Outcome of one upsert call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    /// Codes that did not exist before
    pub inserted: usize,
    /// Codes whose existing row was overwritten
    pub updated: usize,
}

/// Destination of normalized catalog records
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert or update every record by `code`, all or nothing
    ///
    /// Callers must not pass the same code twice in one call.
    async fn upsert(&self, records: &[CatalogRecord]) -> Result<UpsertStats, WriteError>;
}

/// Key/value result cache that can drop entries
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn forget(&self, keys: &[String]) -> Result<(), WriteError>;
}
