//! Shared fixtures for catalog import integration tests
//!
//! [`Harness`] wires an [`ImportOrchestrator`] to in-memory catalog and cache
//! stores and a filesystem progress store in a temporary directory. The same
//! harness can run several imports in a row, which is how resume scenarios
//! are exercised.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use catalog_import::blob::FsBlobStore;
use catalog_import::progress::BlobProgressStore;
use catalog_import::report::CollectingReporter;
use catalog_import::storage::{MemoryCacheStore, MemoryCatalogStore};
use catalog_import::{BatchUpsertWriter, ImportOptions, ImportOrchestrator};
use tempfile::TempDir;

/// Initialize tracing for tests (idempotent)
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,catalog_import=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Write a TSV file with `header` and `rows` into `dir`
pub fn write_tsv(dir: &Path, name: &str, header: &[&str], rows: &[Vec<String>]) -> PathBuf {
    let mut content = header.join("\t");
    content.push('\n');
    for row in rows {
        content.push_str(&row.join("\t"));
        content.push('\n');
    }

    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write TSV fixture");
    path
}

/// Rows `P1..=Pn` with a name and a comma-decimal energy value
pub fn numbered_rows(count: usize) -> Vec<Vec<String>> {
    (1..=count)
        .map(|i| vec![format!("P{}", i), format!("Product {}", i), format!("{},5", i)])
        .collect()
}

pub const BASIC_HEADER: [&str; 3] = ["code", "product_name", "energy-kcal_100g"];

pub struct Harness {
    pub catalog: Arc<MemoryCatalogStore>,
    pub cache: Arc<MemoryCacheStore>,
    pub progress: Arc<BlobProgressStore<FsBlobStore>>,
    pub reporter: Arc<CollectingReporter>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let state_dir = dir.path().join("state");

        Self {
            catalog: Arc::new(MemoryCatalogStore::new()),
            cache: Arc::new(MemoryCacheStore::new()),
            progress: Arc::new(BlobProgressStore::new(FsBlobStore::new(state_dir))),
            reporter: Arc::new(CollectingReporter::new()),
            dir,
        }
    }

    pub fn orchestrator(&self) -> ImportOrchestrator {
        let writer = BatchUpsertWriter::new(self.catalog.clone(), self.cache.clone());
        ImportOrchestrator::new(writer, self.progress.clone(), self.reporter.clone())
    }

    /// Options for `input` with no throttle
    pub fn options(&self, input: &Path) -> ImportOptions {
        let mut options = ImportOptions::new(input);
        options.throttle = Duration::ZERO;
        options
    }

    pub fn write_tsv(&self, header: &[&str], rows: &[Vec<String>]) -> PathBuf {
        write_tsv(self.dir.path(), "products.tsv", header, rows)
    }

    /// Whether either progress blob exists on disk
    pub fn has_saved_progress(&self) -> bool {
        let root = self.progress.blobs().root();
        root.join("import_progress.json").exists() || root.join("import_stats.json").exists()
    }

    pub fn codes(&self) -> Vec<String> {
        self.catalog.rows().into_iter().map(|r| r.code).collect()
    }
}
