//! Batch upsert writer
//!
//! Commits one batch of records through a [`CatalogStore`] and then drops the
//! cached lookups for every code it touched. A batch may contain the same code
//! more than once (a product edited twice in one export chunk); only the last
//! occurrence is written.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::WriteError;
use crate::models::CatalogRecord;
use crate::storage::{CacheStore, CatalogStore, UpsertStats};

/// Cached summaries that go stale after a bulk import
pub const AGGREGATE_CACHE_KEYS: [&str; 4] = [
    "popular_products",
    "products_by_region",
    "products_by_country",
    "catalog_stats",
];

/// Cache key of the single-product lookup for `code`
pub fn product_cache_key(code: &str) -> String {
    format!("product:{}", code)
}

/// Result of a successful flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Records handed to the writer
    pub received: usize,
    /// Distinct codes written
    pub written: usize,
    pub stats: UpsertStats,
}

/// Keep the last record for each code, in first-seen order
pub fn collapse_by_code(batch: Vec<CatalogRecord>) -> Vec<CatalogRecord> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(batch.len());
    let mut unique: Vec<CatalogRecord> = Vec::with_capacity(batch.len());

    for record in batch {
        match positions.get(&record.code) {
            Some(&idx) => unique[idx] = record,
            None => {
                positions.insert(record.code.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

/// Writes batches to the catalog and keeps the cache coherent
#[derive(Clone)]
pub struct BatchUpsertWriter {
    catalog: Arc<dyn CatalogStore>,
    cache: Arc<dyn CacheStore>,
}

impl BatchUpsertWriter {
    pub fn new(catalog: Arc<dyn CatalogStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { catalog, cache }
    }

    /// Commit `batch` in one idempotent upsert, then invalidate its cache keys
    pub async fn flush(&self, batch: Vec<CatalogRecord>) -> Result<FlushOutcome, WriteError> {
        let received = batch.len();
        let records = collapse_by_code(batch);
        let written = records.len();

        if received != written {
            debug!(received, written, "Collapsed duplicate codes in batch");
        }

        let stats = self.catalog.upsert(&records).await?;

        let keys: Vec<String> = records.iter().map(|r| product_cache_key(&r.code)).collect();
        if let Err(e) = self.cache.forget(&keys).await {
            // Rows are already committed; a stale cache entry expires on its own.
            warn!(error = %e, keys = keys.len(), "Failed to invalidate product cache entries");
        }

        Ok(FlushOutcome {
            received,
            written,
            stats,
        })
    }

    /// Drop the cached summaries listed in [`AGGREGATE_CACHE_KEYS`]
    pub async fn invalidate_aggregates(&self) -> Result<(), WriteError> {
        let keys: Vec<String> = AGGREGATE_CACHE_KEYS.iter().map(|k| k.to_string()).collect();
        self.cache.forget(&keys).await
    }
}
