//! Process-local stores
//!
//! [`MemoryCatalogStore`] behaves like the PostgreSQL store where it matters:
//! rows are keyed by code, a batch is applied all-or-nothing, and a batch that
//! names the same code twice is rejected. It can also be told to fail a given
//! upsert call.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{CacheStore, CatalogStore, UpsertStats};
use crate::error::WriteError;
use crate::models::CatalogRecord;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct CatalogState {
    rows: BTreeMap<String, CatalogRecord>,
    calls: usize,
    fail_on_call: Option<usize>,
    batches: Vec<Vec<String>>,
}

/// Catalog kept in a sorted map
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    state: Mutex<CatalogState>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `call`-th upsert (1-based, counted over the store's lifetime) fail
    pub fn fail_on_call(&self, call: usize) {
        lock(&self.state).fail_on_call = Some(call);
    }

    pub fn get(&self, code: &str) -> Option<CatalogRecord> {
        lock(&self.state).rows.get(code).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rows ordered by code
    pub fn rows(&self) -> Vec<CatalogRecord> {
        lock(&self.state).rows.values().cloned().collect()
    }

    /// Codes of every committed batch, in commit order
    pub fn committed_batches(&self) -> Vec<Vec<String>> {
        lock(&self.state).batches.clone()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn upsert(&self, records: &[CatalogRecord]) -> Result<UpsertStats, WriteError> {
        let mut state = lock(&self.state);
        state.calls += 1;

        if state.fail_on_call == Some(state.calls) {
            return Err(WriteError::Rejected(format!(
                "injected failure on upsert call {}",
                state.calls
            )));
        }

        let mut seen = HashSet::with_capacity(records.len());
        if let Some(dup) = records.iter().find(|r| !seen.insert(r.code.as_str())) {
            return Err(WriteError::Rejected(format!(
                "code '{}' appears twice in one batch",
                dup.code
            )));
        }

        let mut stats = UpsertStats::default();
        for record in records {
            if state.rows.insert(record.code.clone(), record.clone()).is_some() {
                stats.updated += 1;
            } else {
                stats.inserted += 1;
            }
        }
        state.batches.push(records.iter().map(|r| r.code.clone()).collect());

        Ok(stats)
    }
}

/// Cache that records which keys were invalidated
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    forgotten: Mutex<Vec<String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forgotten(&self) -> Vec<String> {
        lock(&self.forgotten).clone()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn forget(&self, keys: &[String]) -> Result<(), WriteError> {
        lock(&self.forgotten).extend(keys.iter().cloned());
        Ok(())
    }
}

/// Cache for runs without a cache backend
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn forget(&self, _keys: &[String]) -> Result<(), WriteError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_counts_inserts_and_updates() {
        let store = MemoryCatalogStore::new();
        let stats = store
            .upsert(&[CatalogRecord::new("A"), CatalogRecord::new("B")])
            .await
            .unwrap();
        assert_eq!(stats, UpsertStats { inserted: 2, updated: 0 });

        let stats = store.upsert(&[CatalogRecord::new("B")]).await.unwrap();
        assert_eq!(stats, UpsertStats { inserted: 0, updated: 1 });
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_codes_in_one_call_are_rejected() {
        let store = MemoryCatalogStore::new();
        let result = store
            .upsert(&[CatalogRecord::new("A"), CatalogRecord::new("A")])
            .await;
        assert!(matches!(result, Err(WriteError::Rejected(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_applies_nothing() {
        let store = MemoryCatalogStore::new();
        store.fail_on_call(2);

        store.upsert(&[CatalogRecord::new("A")]).await.unwrap();
        assert!(store.upsert(&[CatalogRecord::new("B")]).await.is_err());
        store.upsert(&[CatalogRecord::new("C")]).await.unwrap();

        assert!(store.get("B").is_none());
        assert_eq!(store.committed_batches(), vec![vec!["A".to_string()], vec!["C".to_string()]]);
    }
}
