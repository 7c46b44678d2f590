//! Catalog Import - resumable TSV product catalog importer

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use catalog_common::logging::{init_logging, LogConfig, LogLevel};
use catalog_import::blob::FsBlobStore;
use catalog_import::config::ImportConfig;
use catalog_import::db::create_pool;
use catalog_import::progress::BlobProgressStore;
use catalog_import::report::{ConsoleReporter, ProgressReporter, TracingReporter};
use catalog_import::storage::{PgCacheStore, PgCatalogStore};
use catalog_import::{BatchUpsertWriter, ImportOptions, ImportOrchestrator, ImportSummary};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "catalog-import")]
#[command(author, version, about = "Import a product catalog TSV export in resumable chunks")]
struct Cli {
    /// Tab-separated export with a header row
    input: PathBuf,

    /// Stop after this many rows were processed in this run
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Only import products from the regional market
    #[arg(long)]
    regional: bool,

    /// Only import products mentioning this country
    #[arg(long, value_name = "NAME")]
    country: Option<String>,

    /// Rows per committed chunk [default: 500, env: IMPORT_CHUNK_SIZE]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: Option<u64>,

    /// Continue after the saved checkpoint
    #[arg(long)]
    resume: bool,

    /// First data line to process (1-based, header not counted)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    start_line: Option<u64>,

    /// Clear saved progress and counters before starting
    #[arg(long)]
    reset: bool,

    /// Directory for progress state [env: CATALOG_STATE_DIR]
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Pause after each chunk, in milliseconds [env: IMPORT_THROTTLE_MS]
    #[arg(long, value_name = "MS")]
    throttle_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn import_options(&self, config: &ImportConfig) -> Result<ImportOptions> {
        let chunk_size = match self.chunk_size {
            Some(n) => usize::try_from(n).context("--chunk-size is out of range")?,
            None => config.chunk_size,
        };

        let mut options = ImportOptions::new(&self.input);
        options.limit = self.limit;
        options.regional = self.regional;
        options.country = self.country.clone();
        options.chunk_size = chunk_size;
        options.resume = self.resume;
        options.start_line = self.start_line;
        options.reset = self.reset;
        options.throttle = self.throttle_ms.map(Duration::from_millis).unwrap_or(config.throttle);
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("catalog-import")
        .include_location(cli.verbose)
        .build();

    // Environment variables take precedence
    let _guard = match log_config.merge_env().and_then(|config| init_logging(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Catalog import failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ImportSummary> {
    if !cli.input.is_file() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let mut config = ImportConfig::from_env().context("Failed to load configuration")?;
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }

    let options = cli.import_options(&config)?;
    options.validate()?;

    let pool = create_pool(&config.database)
        .await
        .context("Failed to connect to the catalog database")?;

    let writer = BatchUpsertWriter::new(
        Arc::new(PgCatalogStore::new(pool.clone())),
        Arc::new(PgCacheStore::new(pool, config.cache_prefix.clone())),
    );

    let progress = Arc::new(BlobProgressStore::new(FsBlobStore::new(&config.state_dir)));

    let reporter: Arc<dyn ProgressReporter> = if std::io::stderr().is_terminal() {
        Arc::new(ConsoleReporter::new("Importing catalog"))
    } else {
        Arc::new(TracingReporter)
    };

    info!(
        input = %options.input.display(),
        state_dir = %config.state_dir.display(),
        "Catalog import starting"
    );

    let summary = ImportOrchestrator::new(writer, progress, reporter)
        .run(&options)
        .await?;

    Ok(summary)
}
