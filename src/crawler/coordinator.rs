//! Scrape coordinator - main pipeline orchestration logic
//!
//! This module wires the pipeline stages together:
//! - Planning the listing URLs
//! - Fetching pages (reusing HTML cached during link discovery)
//! - Parsing pages into raw records and enforcing product caps
//! - Cleaning the batch once and handing it to the sink

use super::fetcher::{FetchSummary, Fetcher};
use super::parser::PageParser;
use super::planner::{plan, UrlPlan};
use crate::cleaner::Cleaner;
use crate::config::SiteConfig;
use crate::output::ProductSink;
use crate::product::RawRecord;
use crate::state::RunStage;
use crate::{Result, ScrapeError};
use std::path::{Path, PathBuf};

/// Per-run switches that do not belong in the site config
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Process only the first planned page and skip cleaning and export
    pub dry_run: bool,

    /// Cap applied on top of the config's `max_products`; the lower wins
    pub max_products: Option<usize>,

    /// Directory to save each parsed page as `page_<n>.html`
    pub raw_html_dir: Option<PathBuf>,
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub site_name: String,

    /// URLs in the plan
    pub pages_planned: usize,

    /// Pages that produced HTML and were parsed
    pub pages_with_html: usize,

    /// Raw records kept after caps
    pub raw_records: usize,

    /// Products handed to the sink; zero for dry runs
    pub products: usize,

    /// Request outcomes, including fetches made while planning
    pub fetch: FetchSummary,

    /// Stage the run finished collecting in (`Capped` or `Exhausted`)
    pub collection: RunStage,

    pub stage: RunStage,
    pub dry_run: bool,
}

/// Main pipeline coordinator structure
pub struct Coordinator {
    config: SiteConfig,
    options: RunOptions,
    fetcher: Fetcher,
    parser: PageParser,
    cleaner: Cleaner,
    stage: RunStage,
}

impl Coordinator {
    /// Creates a coordinator with a fetcher built from the site's request settings
    ///
    /// # Arguments
    ///
    /// * `config` - A validated site configuration
    /// * `options` - Per-run switches
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ScrapeError)` - A selector failed to compile or the HTTP client could not be built
    pub fn new(config: SiteConfig, options: RunOptions) -> Result<Self> {
        let fetcher = Fetcher::new(config.request.clone())?;
        Self::with_fetcher(config, options, fetcher)
    }

    /// Creates a coordinator around an existing fetcher
    ///
    /// Useful for pinning the User-Agent picker in tests.
    pub fn with_fetcher(
        config: SiteConfig,
        options: RunOptions,
        fetcher: Fetcher,
    ) -> Result<Self> {
        let parser = PageParser::new(&config.parsing, config.base_url.clone())?;
        let cleaner = Cleaner::new(&config.cleaning);

        Ok(Self {
            config,
            options,
            fetcher,
            parser,
            cleaner,
            stage: RunStage::Idle,
        })
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    fn advance(&mut self, next: RunStage) -> Result<()> {
        if self.stage == next {
            return Ok(());
        }

        if !self.stage.can_transition_to(next) {
            return Err(ScrapeError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }

        tracing::trace!("Run stage {} -> {}", self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Lowest of the config cap and the per-run cap; zero means no cap
    fn product_cap(&self) -> Option<usize> {
        let caps = [self.config.max_products, self.options.max_products];
        caps.into_iter().flatten().filter(|cap| *cap > 0).min()
    }

    /// Runs the pipeline once, handing the cleaned batch to `sink`
    ///
    /// A coordinator runs at most once; a second call fails with
    /// `InvalidTransition`.
    pub async fn run<S: ProductSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<RunReport> {
        self.advance(RunStage::Planning)?;
        tracing::info!("Starting scrape for site '{}'", self.config.site_name);

        let plan = plan(&self.config, &self.fetcher, self.options.dry_run).await?;
        tracing::info!("Planned {} URLs", plan.urls.len());
        let pages_planned = plan.urls.len();

        let (raw, pages_with_html) = self.collect(plan).await?;
        let collection = self.stage;

        let products = if self.options.dry_run {
            tracing::info!("Dry run: parsed {} products; skipping export", raw.len());
            0
        } else {
            self.advance(RunStage::Cleaning)?;
            let products = self.cleaner.clean(&raw, self.config.currency.as_deref());
            if products.is_empty() {
                tracing::warn!("No products were parsed; exports will be empty");
            }
            sink.write_batch(&products)?;
            products.len()
        };

        self.advance(RunStage::Done)?;

        let fetch = self.fetcher.summary();
        tracing::info!(
            "Requests completed: {} success, {} failure",
            fetch.successes,
            fetch.failures
        );

        Ok(RunReport {
            site_name: self.config.site_name.clone(),
            pages_planned,
            pages_with_html,
            raw_records: raw.len(),
            products,
            fetch,
            collection,
            stage: self.stage,
            dry_run: self.options.dry_run,
        })
    }

    /// Fetches and parses planned pages until they run out or a cap is hit
    async fn collect(&mut self, plan: UrlPlan) -> Result<(Vec<RawRecord>, usize)> {
        let mut raw: Vec<RawRecord> = Vec::new();
        let mut pages = 0usize;

        if plan.urls.is_empty() {
            self.advance(RunStage::Exhausted)?;
            return Ok((raw, pages));
        }

        let concurrent = self.fetcher.settings().max_workers > 1
            && plan.cache.is_empty()
            && !self.options.dry_run
            && plan.urls.len() > 1;

        if concurrent {
            self.advance(RunStage::Fetching)?;
            let records = self.fetcher.fetch_all(&plan.urls).await;

            for record in records {
                let Some(html) = record.html.filter(|html| !html.is_empty()) else {
                    continue;
                };
                pages += 1;
                if self.process_page(&record.url, &html, pages, &mut raw)? {
                    return Ok((raw, pages));
                }
            }
        } else {
            for url in &plan.urls {
                // Discovered pages stay cached; a URL planned twice is not fetched again
                let html = match plan.cached(url) {
                    Some(html) => Some(html.to_string()),
                    None => {
                        self.advance(RunStage::Fetching)?;
                        self.fetcher.fetch(url).await.html
                    }
                };

                if let Some(html) = html.filter(|html| !html.is_empty()) {
                    pages += 1;
                    if self.process_page(url, &html, pages, &mut raw)? {
                        return Ok((raw, pages));
                    }
                }

                if self.options.dry_run {
                    tracing::info!("Dry run enabled; processed first page only");
                    break;
                }
            }
        }

        if pages == 0 {
            tracing::warn!("No page returned HTML");
        }
        self.advance(RunStage::Exhausted)?;
        Ok((raw, pages))
    }

    /// Parses one page into `raw`; returns true once a cap has been reached
    fn process_page(
        &mut self,
        url: &str,
        html: &str,
        page_number: usize,
        raw: &mut Vec<RawRecord>,
    ) -> Result<bool> {
        self.advance(RunStage::Parsing)?;

        if let Some(dir) = &self.options.raw_html_dir {
            save_raw_html(dir, page_number, url, html);
        }

        raw.extend(self.parser.parse(html, url));

        match self.product_cap() {
            Some(cap) if raw.len() >= cap => {
                raw.truncate(cap);
                tracing::info!("Reached product cap of {}", cap);
                self.advance(RunStage::Capped)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn save_raw_html(dir: &Path, page_number: usize, url: &str, html: &str) {
    let path = dir.join(format!("page_{}.html", page_number));
    let result = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, html));

    match result {
        Ok(()) => tracing::debug!("Saved raw HTML for {} to {}", url, path.display()),
        Err(e) => tracing::warn!("Failed to save raw HTML for {}: {}", url, e),
    }
}
