//! Catalog Import Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Resumable, chunked import of tab-separated product-catalog exports.
//!
//! # Pipeline
//!
//! ```text
//! RowTokenizer -> HeaderIndex::normalize -> RowFilter -> batch
//!     -> BatchUpsertWriter::flush -> ProgressStore::save -> ...
//! ```
//!
//! The [`ImportOrchestrator`] drives the pipeline. After every committed chunk
//! it saves a [`progress::Checkpoint`] and cumulative [`progress::Counters`],
//! so an interrupted run can continue with `resume` and re-sends at most one
//! chunk. Writes are upserts keyed by product code, so re-sent rows are
//! harmless.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use catalog_import::blob::MemoryBlobStore;
//! use catalog_import::progress::BlobProgressStore;
//! use catalog_import::report::TracingReporter;
//! use catalog_import::storage::{MemoryCatalogStore, NoopCacheStore};
//! use catalog_import::{BatchUpsertWriter, ImportOptions, ImportOrchestrator};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let writer = BatchUpsertWriter::new(Arc::new(MemoryCatalogStore::new()), Arc::new(NoopCacheStore));
//! let orchestrator = ImportOrchestrator::new(
//!     writer,
//!     Arc::new(BlobProgressStore::new(MemoryBlobStore::new())),
//!     Arc::new(TracingReporter),
//! );
//!
//! let summary = orchestrator.run(&ImportOptions::new("products.tsv")).await?;
//! println!("{}", summary.summary_line());
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod storage;
pub mod tokenizer;
pub mod writer;

pub use error::{ImportError, ImportResult, NormalizeError, WriteError};
pub use models::CatalogRecord;
pub use orchestrator::{ImportOptions, ImportOrchestrator, ImportOutcome, ImportSummary};
pub use writer::BatchUpsertWriter;
