//! docbatch command-line front end
//!
//! Run with: cargo run -p docbatch -- reduce --source ./scans --destination ./out

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use console::style;
use docbatch::processing::BatchSummary;
use docbatch::remote::{InputKind, PageRange, RetryPolicy};
use docbatch::{
    BatchConfig, BatchObserver, BatchRun, CollectionStatus, FileCollector, FileOperationsResult,
    HttpDocumentApi, OperationsManager, RemoteOperationClient, TracingObserver,
    WorkflowDefinition,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docbatch", version)]
#[command(about = "Batch PDF reduction, OCR and image to PDF conversion")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Document service API key
    #[arg(long, global = true, env = "DOCBATCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reduce the size of PDF files
    Reduce(BatchArgs),
    /// Make PDF files searchable
    Ocr {
        #[command(flatten)]
        batch: BatchArgs,

        /// Recognition language, overrides the configuration
        #[arg(long)]
        language: Option<String>,
    },
    /// Convert images to PDF
    ImageToPdf(BatchArgs),
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// File, folder, or `|`-separated list of both
    #[arg(long, short)]
    source: String,

    /// Output folder
    #[arg(long, short)]
    destination: PathBuf,

    /// Worker threads, capped by the service
    #[arg(long, short)]
    workers: Option<usize>,
}

/// Progress bar on top of the logging observer
struct ProgressObserver {
    inner: TracingObserver,
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(files: u64) -> Self {
        let bar = ProgressBar::new(files);
        let progress_style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(progress_style);
        bar.enable_steady_tick(Duration::from_millis(200));

        Self {
            inner: TracingObserver::new(),
            bar,
        }
    }

    fn summary(&self) -> BatchSummary {
        self.inner.summary()
    }
}

impl BatchObserver for ProgressObserver {
    fn upload_started(&self, worker: usize, file: &Path, attempt: u32) {
        self.inner.upload_started(worker, file, attempt);
    }

    fn operation_started(&self, worker: usize, file: &Path, attempt: u32) {
        self.inner.operation_started(worker, file, attempt);
    }

    fn download_started(&self, worker: usize, file: &Path, attempt: u32) {
        self.inner.download_started(worker, file, attempt);
    }

    fn chunk_progress(
        &self,
        worker: usize,
        file: &Path,
        pages: &PageRange,
        page_count: u32,
        attempt: u32,
    ) {
        self.inner
            .chunk_progress(worker, file, pages, page_count, attempt);
        self.bar.set_message(format!("OCR pages {}/{}", pages, page_count));
    }

    fn error(&self, message: &str) {
        self.inner.error(message);
        self.bar.println(format!("{} {}", style("error").red().bold(), message));
        self.bar.inc(1);
    }

    fn warning(&self, message: &str) {
        self.inner.warning(message);
        self.bar
            .println(format!("{} {}", style("warning").yellow().bold(), message));
    }

    fn remaining_tokens(&self, tokens: i64) {
        self.inner.remaining_tokens(tokens);
    }

    fn file_completed(&self, result: &FileOperationsResult) {
        self.inner.file_completed(result);
        self.bar.set_message(
            result
                .input_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        self.bar.inc(1);
    }

    fn worker_paused(&self, worker: usize) {
        self.inner.worker_paused(worker);
    }

    fn worker_completed(&self, worker: usize) {
        self.inner.worker_completed(worker);
    }

    fn all_completed(&self) {
        self.inner.all_completed();
        self.bar.finish_and_clear();
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("{}", style("Batch summary").bold().underlined());
    println!("  Files processed:   {}", style(summary.files_completed).green());
    if summary.files_converted > 0 {
        println!("  Converted to PDF:  {}", summary.files_converted);
    }
    println!("  Errors:            {}", style(summary.errors).red());
    println!("  Warnings:          {}", style(summary.warnings).yellow());
    println!(
        "  Size:              {} -> {} bytes",
        summary.input_size, summary.output_size
    );
    println!("  Reduction ratio:   {:.2}%", summary.reduction_ratio());
    println!("  Saved space:       {:.2}%", summary.saved_space_ratio());
    if let Some(tokens) = summary.remaining_tokens {
        println!("  Remaining tokens:  {}", tokens);
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = BatchConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let api_key = cli
        .api_key
        .context("An API key is required (--api-key or DOCBATCH_API_KEY)")?;

    let (batch, workflow, kind) = match cli.command {
        Command::Reduce(batch) => (
            batch,
            WorkflowDefinition::pdf_reduction(config.reduce.clone()),
            InputKind::Pdf,
        ),
        Command::Ocr { batch, language } => {
            let mut ocr = config.ocr.clone();
            if let Some(language) = language {
                ocr.language = language;
            }
            (batch, WorkflowDefinition::pdf_ocr(ocr), InputKind::Pdf)
        }
        Command::ImageToPdf(batch) => (
            batch,
            WorkflowDefinition::image_to_pdf(config.image_to_pdf.clone()),
            InputKind::Image,
        ),
    };

    // Service lookups
    tracing::info!("Contacting document service at {}...", config.api.base_url);
    let lookup = RemoteOperationClient::new(
        Arc::new(HttpDocumentApi::new(&config.api, &api_key)?),
        RetryPolicy::from_config(&config.retry),
    );
    let limits = lookup
        .service_limits()
        .context("Failed to fetch service limits")?;
    let supported = lookup
        .supported_extensions(kind)
        .context("Failed to fetch supported extensions")?;

    let timeout = limits
        .suggested_client_timeout
        .unwrap_or(Duration::from_secs(config.api.timeout_secs));
    let api = Arc::new(HttpDocumentApi::with_timeout(&config.api, &api_key, timeout)?);

    if config.processing.max_allowed_content_length.is_none() {
        config.processing.max_allowed_content_length = limits.max_allowed_content_length;
    }
    let requested = batch
        .workers
        .unwrap_or(config.processing.worker_count)
        .max(1);
    let worker_count = requested.min(limits.max_client_threads);
    if worker_count < requested {
        tracing::warn!(
            "Service allows at most {} workers, using {} instead of {}",
            limits.max_client_threads,
            worker_count,
            requested
        );
    }

    // Collection
    let collector = FileCollector::new(&config.collection, &supported);
    let outcome = collector.collect(&batch.source, &batch.destination);
    match outcome.status {
        CollectionStatus::Success => {}
        CollectionStatus::SuccessWithWarning => {
            if let Some(message) = &outcome.message {
                eprintln!("{} {}", style("warning").yellow().bold(), message);
            }
        }
        CollectionStatus::Unfulfilled => {
            println!("{}", outcome.message.as_deref().unwrap_or("no file to process"));
            return Ok(ExitCode::SUCCESS);
        }
        CollectionStatus::UnfulfilledWithError => {
            eprintln!(
                "{} {}",
                style("error").red().bold(),
                outcome.message.as_deref().unwrap_or("file collection failed")
            );
            return Ok(ExitCode::FAILURE);
        }
    }

    // Batch
    let file_count = outcome.tasks.len();
    let observer = Arc::new(ProgressObserver::new(file_count as u64));
    let config = Arc::new(config);
    let manager = OperationsManager::new(Arc::clone(&config), observer.clone());
    manager.feed(outcome.tasks);

    let run = BatchRun::new(&config, &batch.destination, workflow).with_worker_count(worker_count);
    manager.start(api, run)?;
    manager.wait();

    let summary = observer.summary();
    print_summary(&summary);

    Ok(if summary.errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docbatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("error").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
