// src/main.rs
mod extractors;
mod filters;
mod niche;
mod portal;
mod storage;
mod utils;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use extractors::page::{NoticeExtractor, SelectorProfile};
use filters::FilterCriteria;
use niche::{NicheClassifier, OpenAiClient};
use portal::client::{self, PortalClient, ScrapeConfig};
use portal::models::NoticeRecord;
use utils::AppError;

/// Scraper and filters for public procurement notices
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch listing pages and save the extracted notices
    Scrape(ScrapeArgs),
    /// Filter a saved notice file by organization, modality and value
    ///
    /// Output records always use this tool's English keys (title, organization,
    /// modality, value, value_text, link); legacy Portuguese keys are read but not
    /// written back, and unknown keys are dropped.
    Filter(FilterArgs),
    /// Keep only notices an LLM judges relevant to a niche
    ///
    /// Output records always use this tool's English keys; legacy Portuguese keys
    /// are read but not written back, and unknown keys are dropped.
    Niche(NicheArgs),
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Number of listing pages to fetch, starting at 1
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// URL template; `{page}` is replaced by the page number
    #[arg(long, default_value = client::DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = client::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Pause after each page, in seconds
    #[arg(long, default_value_t = client::DEFAULT_DELAY_SECS)]
    delay: f64,

    /// Output JSON file (defaults to $OUTPUT_PATH or ./data/licitacoes.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append a UTC timestamp to the output file name
    #[arg(long)]
    timestamped: bool,

    /// JSON selector profile overriding the built-in one
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Run continuously
    #[arg(long = "loop")]
    run_forever: bool,

    /// Seconds between cycles in continuous mode
    #[arg(long, default_value_t = 600)]
    loop_interval: u64,

    /// Save raw and annotated copies of each fetched page into this directory
    #[arg(short, long)]
    debug: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Saved notice file
    #[arg(short, long)]
    input: PathBuf,

    /// Case-insensitive substring of the organization
    #[arg(long, alias = "orgao")]
    organization: Option<String>,

    /// Case-insensitive substring of the modality
    #[arg(long, alias = "modalidade")]
    modality: Option<String>,

    /// Minimum value (inclusive)
    #[arg(long, alias = "valor-min")]
    value_min: Option<f64>,

    /// Maximum value (inclusive)
    #[arg(long, alias = "valor-max")]
    value_max: Option<f64>,

    /// Write results here instead of printing them
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct NicheArgs {
    /// Saved notice file
    #[arg(short, long)]
    input: PathBuf,

    /// Free-text description of the business niche
    #[arg(long)]
    niche: String,

    /// Notices per LLM request
    #[arg(long, default_value_t = niche::classifier::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Stop after this many batches
    #[arg(long)]
    max_chunks: Option<usize>,

    /// Chat model name
    #[arg(long, env = "OPENAI_MODEL", default_value = niche::openai::DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = niche::openai::DEFAULT_BASE_URL)]
    api_base: String,

    /// Seconds before a chat request is abandoned and its batch skipped
    #[arg(long, default_value_t = niche::openai::DEFAULT_TIMEOUT_SECS)]
    api_timeout: u64,

    /// Write results here instead of printing them
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Environment and logging
    dotenvy::dotenv().ok();
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let cli = Cli::parse();
    tracing::debug!("Parsed arguments: {:?}", cli);

    match cli.command {
        Command::Scrape(args) => run_scrape(args).await,
        Command::Filter(args) => run_filter(args),
        Command::Niche(args) => run_niche(args).await,
    }
}

async fn run_scrape(args: ScrapeArgs) -> Result<(), AppError> {
    // Bad profiles fail before any request goes out.
    let profile = match &args.profile {
        Some(path) => SelectorProfile::load(path)?,
        None => SelectorProfile::default(),
    };
    let extractor = NoticeExtractor::new(profile);

    let config = ScrapeConfig {
        pages: args.pages,
        base_url_template: args.base_url.clone(),
        timeout: Duration::from_secs(args.timeout),
        delay: ScrapeConfig::delay_from_secs(args.delay),
        debug_dir: args.debug.clone(),
        ..Default::default()
    };
    let portal = PortalClient::new(&config)?;
    let output = args.output.clone().unwrap_or_else(storage::default_output_path);

    if !args.run_forever {
        scrape_once(&portal, &extractor, &config, &output, args.timestamped).await?;
        return Ok(());
    }

    let interval = Duration::from_secs(args.loop_interval.max(1));
    tracing::info!("Continuous mode: one cycle every {}s", interval.as_secs());
    loop {
        if let Err(e) = scrape_once(&portal, &extractor, &config, &output, args.timestamped).await {
            tracing::error!("Scrape cycle failed: {}", e);
        }
        tokio::time::sleep(interval).await;
    }
}

async fn scrape_once(
    portal: &PortalClient,
    extractor: &NoticeExtractor,
    config: &ScrapeConfig,
    output: &Path,
    timestamped: bool,
) -> Result<usize, AppError> {
    tracing::info!("Scraping {} page(s) from {}", config.pages.max(1), config.base_url_template);

    let report = client::scrape_pages(portal, extractor, config).await;
    let finished_at = chrono::Utc::now();
    let (fetched, skipped) = (report.pages_fetched(), report.pages_skipped());

    let target = if timestamped {
        storage::timestamped_path(output, finished_at)
    } else {
        output.to_path_buf()
    };

    let record_count = report.record_count();
    if let Err(e) = storage::save_run_metadata(&target, &config.base_url_template, &report, record_count, finished_at) {
        tracing::warn!("Failed to save run metadata: {}", e);
    }

    let records = report.into_records();
    let path = storage::save_records(&target, &records)?;

    tracing::info!(
        "Scrape finished: {} notices saved to {} ({} pages fetched, {} skipped)",
        records.len(),
        path.display(),
        fetched,
        skipped
    );
    Ok(records.len())
}

fn emit(records: &[NoticeRecord], output: Option<&Path>, label: &str) -> Result<(), AppError> {
    match output {
        Some(path) => {
            storage::save_records(path, records)?;
            tracing::info!("{} finished: {} notices saved to {}", label, records.len(), path.display());
        }
        None => {
            let json = serde_json::to_string_pretty(records)
                .map_err(|e| utils::error::StorageError::SerializationError(e.to_string()))?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_filter(args: FilterArgs) -> Result<(), AppError> {
    let records = storage::load_records(&args.input)?;
    let criteria = FilterCriteria {
        organization: args.organization,
        modality: args.modality,
        value_min: args.value_min,
        value_max: args.value_max,
    };

    if criteria.is_empty() {
        tracing::info!("No filter criteria given; every notice passes");
    }
    let results = filters::filter_records(&records, &criteria);
    tracing::info!("{} of {} notices match {:?}", results.len(), records.len(), criteria);
    emit(&results, args.output.as_deref(), "Filter")
}

async fn run_niche(args: NicheArgs) -> Result<(), AppError> {
    let records = storage::load_records(&args.input)?;
    if records.is_empty() {
        tracing::info!("No notices in {}, nothing to classify", args.input.display());
        return emit(&[], args.output.as_deref(), "Niche");
    }

    let chat = OpenAiClient::from_env(Duration::from_secs(args.api_timeout))?
        .with_base_url(args.api_base);
    tracing::debug!("Using chat endpoint {}", chat.base_url());
    let classifier = NicheClassifier::new(chat)
        .with_model(args.model)
        .with_chunk_size(args.chunk_size)
        .with_max_chunks(args.max_chunks);

    let report = classifier.classify(&records, &args.niche).await;
    let skipped = report.batches_skipped();
    let results = report.into_records();
    tracing::info!(
        "Niche '{}': kept {} of {} notices ({} batches skipped)",
        args.niche,
        results.len(),
        records.len(),
        skipped
    );
    emit(&results, args.output.as_deref(), "Niche")
}
