//! Import orchestrator
//!
//! Drives one pass over the input: position, stream, flush in chunks, drain,
//! then either finish (input exhausted) or stop with progress retained
//! (row limit reached).
//!
//! Counters accumulated since the last flush are "pending". They are folded
//! into the run totals only when a flush commits, so the persisted counters
//! always describe exactly the rows up to the persisted `last_line`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ImportError, ImportResult};
use crate::filter::{FilterTable, RowFilter};
use crate::models::CatalogRecord;
use crate::normalizer::HeaderIndex;
use crate::progress::{Checkpoint, Counters, ProgressStore, StoredCounters};
use crate::report::ProgressReporter;
use crate::tokenizer::RowTokenizer;
use crate::writer::BatchUpsertWriter;

/// Rows per flushed batch unless overridden
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Pause after each flush unless overridden
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

/// Options for one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub input: PathBuf,
    /// Stop after this many rows were processed in this run
    pub limit: Option<u64>,
    /// Only accept rows from the regional market
    pub regional: bool,
    /// Only accept rows mentioning this country
    pub country: Option<String>,
    pub chunk_size: usize,
    /// Continue after the saved checkpoint
    pub resume: bool,
    /// First data line to process (1-based); wins over `resume`
    pub start_line: Option<u64>,
    /// Forget saved progress before starting
    pub reset: bool,
    pub throttle: Duration,
}

impl ImportOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            limit: None,
            regional: false,
            country: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            resume: false,
            start_line: None,
            reset: false,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn validate(&self) -> ImportResult<()> {
        if self.chunk_size == 0 {
            return Err(ImportError::invalid_options("chunk size must be at least 1"));
        }
        if self.limit == Some(0) {
            return Err(ImportError::invalid_options("limit must be at least 1"));
        }
        if self.start_line == Some(0) {
            return Err(ImportError::invalid_options(
                "start line must be at least 1 (data lines are numbered from 1)",
            ));
        }
        if let Some(country) = &self.country {
            if country.trim().is_empty() {
                return Err(ImportError::invalid_options("country filter must not be blank"));
            }
        }
        Ok(())
    }

    /// Build the row filter these options ask for
    pub fn row_filter(&self, table: &FilterTable) -> RowFilter {
        let mut filter = RowFilter::none();
        if self.regional {
            filter = filter.with_regional_market(table.clone());
        }
        if let Some(country) = &self.country {
            filter = filter.with_country(country.trim());
        }
        filter
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Input exhausted; saved progress was cleared
    Completed,
    /// Row limit reached; saved progress was kept for a later `--resume`
    LimitReached,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub outcome: ImportOutcome,
    /// First data line this run was allowed to process
    pub start_line: u64,
    /// Last data line consumed
    pub last_line: u64,
    /// Chunk index after the run (cumulative across resumed runs)
    pub chunks: u64,
    /// Counters for this run only
    pub run: Counters,
    /// Baseline plus this run
    pub totals: Counters,
}

impl ImportSummary {
    pub fn summary_line(&self) -> String {
        let verb = match self.outcome {
            ImportOutcome::Completed => "Import completed",
            ImportOutcome::LimitReached => "Import stopped at row limit",
        };
        format!(
            "{verb}: processed={} imported={} skipped={} (this run: processed={} imported={} skipped={}), last line {}, {} chunks",
            self.totals.processed,
            self.totals.imported,
            self.totals.skipped,
            self.run.processed,
            self.run.imported,
            self.run.skipped,
            self.last_line,
            self.chunks,
        )
    }
}

/// Mutable bookkeeping for one run
#[derive(Debug)]
struct RunState {
    baseline: Counters,
    /// Folded in at each persist
    run: Counters,
    /// Accumulated since the last persist
    pending: Counters,
    chunk: u64,
    /// `(last_line, last_chunk)` of the newest state this run persisted
    committed: Option<(u64, u64)>,
}

impl RunState {
    fn processed(&self) -> u64 {
        self.run.processed + self.pending.processed
    }

    fn committed_totals(&self) -> Counters {
        self.baseline + self.run
    }

    /// Fold pending counters into the run and move the committed mark
    fn commit(&mut self, line: u64) {
        self.run += self.pending;
        self.pending = Counters::default();
        self.committed = Some((line, self.chunk));
    }
}

/// Streams a catalog export into the catalog store
pub struct ImportOrchestrator {
    writer: BatchUpsertWriter,
    progress: Arc<dyn ProgressStore>,
    reporter: Arc<dyn ProgressReporter>,
    filters: FilterTable,
}

impl ImportOrchestrator {
    pub fn new(
        writer: BatchUpsertWriter,
        progress: Arc<dyn ProgressStore>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            writer,
            progress,
            reporter,
            filters: FilterTable::default(),
        }
    }

    /// Replace the default country and exclusion lists
    pub fn with_filter_table(mut self, filters: FilterTable) -> Self {
        self.filters = filters;
        self
    }

    #[instrument(skip(self, options), fields(input = %options.input.display()))]
    pub async fn run(&self, options: &ImportOptions) -> ImportResult<ImportSummary> {
        options.validate()?;

        let started = Instant::now();
        let mut tokenizer = RowTokenizer::open(&options.input)?;
        let index = HeaderIndex::new(tokenizer.headers());
        let filter = options.row_filter(&self.filters);

        let (mut state, start_line) = self.position(options).await?;

        info!(
            start_line,
            chunk_size = options.chunk_size,
            limit = ?options.limit,
            filtered = filter.is_enabled(),
            "Starting catalog import"
        );

        let result = self
            .stream(&mut tokenizer, &index, &filter, options, &mut state, start_line)
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.persist_committed(&state).await;
                self.reporter.finish();
                return Err(e);
            }
        };

        let last_line = tokenizer.rows_read();

        match outcome {
            ImportOutcome::Completed => {
                self.progress.delete().await?;
                if let Err(e) = self.writer.invalidate_aggregates().await {
                    warn!(error = %e, "Failed to invalidate aggregate cache entries");
                }
            }
            ImportOutcome::LimitReached => {
                info!(last_line, "Row limit reached; progress kept for --resume");
            }
        }

        let summary = ImportSummary {
            outcome,
            start_line,
            last_line,
            chunks: state.chunk,
            run: state.run,
            totals: state.committed_totals(),
        };

        self.reporter.emit(&summary.summary_line());
        self.reporter.finish();

        info!(
            processed = summary.totals.processed,
            imported = summary.totals.imported,
            skipped = summary.totals.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Catalog import finished"
        );

        Ok(summary)
    }

    /// Resolve the starting line and load (or clear) the counter baseline
    async fn position(&self, options: &ImportOptions) -> ImportResult<(RunState, u64)> {
        let saved = if options.reset {
            self.progress.delete().await?;
            info!("Cleared saved import progress");
            Default::default()
        } else {
            self.progress.load().await?
        };

        let baseline = saved.counters.map(|c| c.totals).unwrap_or_default();
        let checkpoint = if options.resume { saved.checkpoint } else { None };

        let (start_line, chunk, committed) = match (options.start_line, checkpoint) {
            (Some(line), _) => (line, 0, None),
            (None, Some(cp)) => {
                info!(last_line = cp.last_line, last_chunk = cp.last_chunk, "Resuming from checkpoint");
                (cp.last_line + 1, cp.last_chunk, Some((cp.last_line, cp.last_chunk)))
            }
            (None, None) => (1, 0, None),
        };

        let state = RunState {
            baseline,
            run: Counters::default(),
            pending: Counters::default(),
            chunk,
            committed,
        };

        Ok((state, start_line))
    }

    async fn stream(
        &self,
        tokenizer: &mut RowTokenizer,
        index: &HeaderIndex,
        filter: &RowFilter,
        options: &ImportOptions,
        state: &mut RunState,
        start_line: u64,
    ) -> ImportResult<ImportOutcome> {
        while tokenizer.rows_read() + 1 < start_line {
            if !tokenizer.skip_row()? {
                break;
            }
        }
        if start_line > 1 {
            debug!(skipped_to = tokenizer.rows_read(), "Positioned input");
        }

        let mut batch: Vec<CatalogRecord> = Vec::with_capacity(options.chunk_size);
        let mut limit_reached = false;

        loop {
            if let Some(limit) = options.limit {
                if state.processed() >= limit {
                    limit_reached = true;
                    break;
                }
            }

            let Some(values) = tokenizer.next_row()? else {
                break;
            };
            let line = tokenizer.rows_read();

            match index.normalize(&values) {
                Ok(record) if filter.accepts(&record) => {
                    batch.push(record);
                    state.pending.processed += 1;
                    state.pending.imported += 1;
                }
                Ok(record) => {
                    trace!(line, code = %record.code, "Row rejected by filter");
                    state.pending.skipped += 1;
                }
                Err(e) => {
                    debug!(line, error = %e, "Skipping row");
                    state.pending.skipped += 1;
                }
            }

            if batch.len() >= options.chunk_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(options.chunk_size));
                self.flush(full, line, state, options.throttle).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(batch, tokenizer.rows_read(), state, Duration::ZERO).await?;
        }

        // Rows read after the last flush were all skipped. A limit stop never
        // gets here with skips pending, so they only need counting.
        state.run += state.pending;
        state.pending = Counters::default();

        Ok(if limit_reached {
            ImportOutcome::LimitReached
        } else {
            ImportOutcome::Completed
        })
    }

    async fn flush(
        &self,
        batch: Vec<CatalogRecord>,
        line: u64,
        state: &mut RunState,
        throttle: Duration,
    ) -> ImportResult<()> {
        let outcome = self.writer.flush(batch).await?;

        state.chunk += 1;
        state.commit(line);
        self.save(state).await?;

        let totals = state.committed_totals();
        self.reporter.emit(&format!(
            "Chunk {} committed at line {}: processed={} imported={} skipped={} (inserted {}, updated {})",
            state.chunk,
            line,
            totals.processed,
            totals.imported,
            totals.skipped,
            outcome.stats.inserted,
            outcome.stats.updated,
        ));

        if !throttle.is_zero() {
            tokio::time::sleep(throttle).await;
        }

        Ok(())
    }

    async fn save(&self, state: &RunState) -> ImportResult<()> {
        if let Some((line, chunk)) = state.committed {
            self.progress
                .save(
                    &Checkpoint::new(line, chunk),
                    &StoredCounters::new(state.committed_totals()),
                )
                .await?;
        }
        Ok(())
    }

    /// Best-effort save of the last committed state before surfacing a fatal error
    async fn persist_committed(&self, state: &RunState) {
        let Some((line, chunk)) = state.committed else {
            warn!("Import aborted before any chunk was committed");
            return;
        };

        match self.save(state).await {
            Ok(()) => warn!(last_line = line, last_chunk = chunk, "Import aborted; progress saved for --resume"),
            Err(e) => warn!(error = %e, "Import aborted and progress could not be saved"),
        }
    }
}
