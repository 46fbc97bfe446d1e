//! EcomScrape main entry point
//!
//! This is the command-line interface for the EcomScrape listing scraper.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ecomscrape::config::load_config_with_hash;
use ecomscrape::crawler::{Coordinator, RunOptions};
use ecomscrape::output::{print_run_summary, ExportFormat, FileSink};
use ecomscrape::server::{self, DATA_PATH_ENV, DEFAULT_DATA_PATH};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Directory raw listing pages are saved to with --save-raw-html
const RAW_HTML_DIR: &str = "outputs/raw";

/// EcomScrape: a config-driven e-commerce listing scraper
///
/// EcomScrape crawls listing pages described by a site config, extracts
/// product fields with CSS selectors, cleans them and exports the result.
#[derive(Parser, Debug)]
#[command(name = "ecomscrape")]
#[command(version)]
#[command(about = "A config-driven e-commerce listing scraper", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a site and export the products
    Scrape(ScrapeArgs),

    /// Serve the latest snapshot over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Path to the site configuration (YAML, JSON or TOML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Export formats (csv, tsv, xlsx, json)
    #[arg(
        short = 'f',
        long = "format",
        num_args = 1..,
        default_values_t = [ExportFormat::Csv, ExportFormat::Xlsx]
    )]
    formats: Vec<ExportFormat>,

    /// Stop after this many products (the config cap still applies)
    #[arg(long)]
    max_products: Option<usize>,

    /// Directory for exported files and the latest snapshot
    #[arg(short, long, default_value = "outputs/processed")]
    output_dir: PathBuf,

    /// Also write debug logs to this file
    #[arg(long, default_value = "outputs/scrape.log")]
    log_file: PathBuf,

    /// Fetch and parse the first page only, without exporting
    #[arg(long)]
    dry_run: bool,

    /// Save every parsed page under outputs/raw
    #[arg(long)]
    save_raw_html: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Snapshot file to serve
    #[arg(long, env = DATA_PATH_ENV, default_value = DEFAULT_DATA_PATH)]
    data_path: PathBuf,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(short, long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Command::Scrape(args) => Some(args.log_file.as_path()),
        Command::Serve(_) => None,
    };
    setup_logging(cli.verbose, cli.quiet, log_file);

    let result = match cli.command {
        Command::Scrape(args) => handle_scrape(args).await,
        Command::Serve(args) => handle_serve(args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file, a second non-ANSI layer records debug output there
/// regardless of console verbosity.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ecomscrape=info,warn"),
            1 => EnvFilter::new("ecomscrape=debug,info"),
            2 => EnvFilter::new("ecomscrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(filter);

    let file_layer = log_file.and_then(open_log_file).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
            .with_filter(EnvFilter::new("ecomscrape=debug,info"))
    });

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Cannot create log directory {}: {}", parent.display(), e);
            return None;
        }
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", path.display(), e);
            None
        }
    }
}

/// Handles the scrape command: load config, run the pipeline, export
async fn handle_scrape(args: ScrapeArgs) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", args.config.display());
    let config = match load_config_with_hash(&args.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Ok(ExitCode::from(1));
        }
    };

    let options = RunOptions {
        dry_run: args.dry_run,
        max_products: args.max_products,
        raw_html_dir: args.save_raw_html.then(|| PathBuf::from(RAW_HTML_DIR)),
    };

    let mut sink = FileSink::new(args.formats, &args.output_dir);
    let mut coordinator =
        Coordinator::new(config, options).context("Failed to set up the scrape")?;

    let report = coordinator
        .run(&mut sink)
        .await
        .context("Scrape failed")?;

    if let Some(export) = sink.last_report() {
        let files: Vec<String> = export
            .files
            .iter()
            .map(|(_, path)| path.display().to_string())
            .collect();
        tracing::info!("Exported files: {}", files.join(", "));
        if let Some(latest) = &export.latest {
            tracing::info!("Latest snapshot: {}", latest.display());
        }
    }

    print_run_summary(&report, sink.last_report());

    Ok(ExitCode::SUCCESS)
}

/// Handles the serve command
async fn handle_serve(args: ServeArgs) -> anyhow::Result<ExitCode> {
    let addr = format!("{}:{}", args.host, args.port);
    server::serve(&addr, args.data_path)
        .await
        .with_context(|| format!("Server on {} failed", addr))?;
    Ok(ExitCode::SUCCESS)
}
