//! Crawler module for page fetching and product extraction
//!
//! This module contains the core scraping pipeline, including:
//! - HTTP fetching with retry, backoff and User-Agent rotation
//! - URL planning for static, templated and link pagination
//! - HTML parsing into raw product records
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod parser;
mod planner;

pub use coordinator::{Coordinator, RunOptions, RunReport};
pub use fetcher::{
    build_http_client, FetchFailure, FetchRecord, FetchSummary, Fetcher, FixedUserAgent,
    RandomUserAgent, UserAgentPicker,
};
pub use parser::{find_next_link, PageParser};
pub use planner::{format_urls, plan, UrlPlan};
pub use crate::state::RunStage;

use crate::config::SiteConfig;
use crate::output::ProductSink;
use crate::Result;

/// Runs a complete scrape
///
/// This is the main entry point for a scrape. It will:
/// 1. Plan the listing URLs
/// 2. Fetch and parse pages until they run out or a cap is hit
/// 3. Clean the raw records into products
/// 4. Hand the batch to `sink` (skipped for dry runs)
///
/// # Arguments
///
/// * `config` - A validated site configuration
/// * `options` - Per-run switches
/// * `sink` - Receives the cleaned batch
///
/// # Returns
///
/// * `Ok(RunReport)` - Run completed
/// * `Err(ScrapeError)` - Setup failed or the sink could not write
pub async fn scrape<S: ProductSink + ?Sized>(
    config: SiteConfig,
    options: RunOptions,
    sink: &mut S,
) -> Result<RunReport> {
    Coordinator::new(config, options)?.run(sink).await
}
