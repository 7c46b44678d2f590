//! Checkpoint and counter persistence
//!
//! Two blobs describe an unfinished import:
//!
//! - `import_progress`: `{last_line, last_chunk, updated_at}`
//! - `import_stats`: `{total_processed, total_imported, total_skipped, updated_at}`
//!
//! They are written together after every flush and removed together when a
//! file has been imported completely.

use std::ops::{Add, AddAssign};

use async_trait::async_trait;
use catalog_common::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::blob::BlobStore;

/// Blob holding the [`Checkpoint`]
pub const PROGRESS_BLOB: &str = "import_progress";
/// Blob holding the [`StoredCounters`]
pub const STATS_BLOB: &str = "import_stats";

/// Last committed position in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last data line (1-based, header excluded) covered by a committed flush
    pub last_line: u64,
    /// Number of chunks flushed so far
    pub last_chunk: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(last_line: u64, last_chunk: u64) -> Self {
        Self {
            last_line,
            last_chunk,
            updated_at: Utc::now(),
        }
    }
}

/// Row tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(rename = "total_processed")]
    pub processed: u64,
    #[serde(rename = "total_imported")]
    pub imported: u64,
    #[serde(rename = "total_skipped")]
    pub skipped: u64,
}

impl Counters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for Counters {
    type Output = Counters;

    fn add(self, rhs: Counters) -> Counters {
        Counters {
            processed: self.processed + rhs.processed,
            imported: self.imported + rhs.imported,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Counters) {
        *self = *self + rhs;
    }
}

/// Cumulative counters as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCounters {
    #[serde(flatten)]
    pub totals: Counters,
    pub updated_at: DateTime<Utc>,
}

impl StoredCounters {
    pub fn new(totals: Counters) -> Self {
        Self {
            totals,
            updated_at: Utc::now(),
        }
    }
}

/// Whatever survived from a previous run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub checkpoint: Option<Checkpoint>,
    pub counters: Option<StoredCounters>,
}

/// Durable home of the importer's checkpoint and counters
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self) -> Result<ProgressState>;

    /// Persist both records; callers pass cumulative totals, not deltas
    ///
    /// Counters are written before the checkpoint. If only the counters land,
    /// the rows after the old checkpoint are read and counted again on resume.
    async fn save(&self, checkpoint: &Checkpoint, counters: &StoredCounters) -> Result<()>;

    /// Forget both records
    async fn delete(&self) -> Result<()>;
}

/// [`ProgressStore`] over any [`BlobStore`], encoded as JSON
pub struct BlobProgressStore<B> {
    blobs: B,
}

impl<B: BlobStore> BlobProgressStore<B> {
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.blobs.read(name).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CatalogError::corrupt_blob(name, e)),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize + Sync>(&self, name: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.blobs.write(name, &bytes).await
    }
}

#[async_trait]
impl<B: BlobStore> ProgressStore for BlobProgressStore<B> {
    async fn load(&self) -> Result<ProgressState> {
        Ok(ProgressState {
            checkpoint: self.read_json(PROGRESS_BLOB).await?,
            counters: self.read_json(STATS_BLOB).await?,
        })
    }

    async fn save(&self, checkpoint: &Checkpoint, counters: &StoredCounters) -> Result<()> {
        self.write_json(STATS_BLOB, counters).await?;
        self.write_json(PROGRESS_BLOB, checkpoint).await
    }

    async fn delete(&self) -> Result<()> {
        self.blobs.delete(PROGRESS_BLOB).await?;
        self.blobs.delete(STATS_BLOB).await
    }
}
