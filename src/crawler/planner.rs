//! URL planning for listing pages
//!
//! Decides which pages a run fetches:
//! - `none`: the configured start URLs, as given
//! - `format`: a numeric range substituted into a URL template
//! - `link`: "next" links followed from each start URL
//!
//! Link discovery has to fetch pages to find their next links. Those pages
//! are returned in the plan's cache so the run does not fetch them again.

use super::fetcher::Fetcher;
use super::parser::find_next_link;
use crate::config::{compile_selector, PaginationConfig, PaginationMode, SiteConfig};
use crate::url::expand_template;
use crate::{ConfigError, ConfigResult};
use std::collections::{HashMap, HashSet};

/// Ordered pages to process plus any HTML already fetched during planning
#[derive(Debug, Clone, Default)]
pub struct UrlPlan {
    pub urls: Vec<String>,
    pub cache: HashMap<String, String>,
}

impl UrlPlan {
    fn from_urls(urls: Vec<String>) -> Self {
        Self {
            urls,
            cache: HashMap::new(),
        }
    }

    pub fn cached(&self, url: &str) -> Option<&str> {
        self.cache.get(url).map(String::as_str)
    }
}

/// Builds the URL plan for a site
///
/// Only `link` mode touches the network. With `dry_run` set, link discovery
/// stops after the first page of each start URL.
pub async fn plan(
    config: &SiteConfig,
    fetcher: &Fetcher,
    dry_run: bool,
) -> ConfigResult<UrlPlan> {
    let Some(pagination) = &config.pagination else {
        return Ok(UrlPlan::from_urls(config.start_urls.clone()));
    };

    match pagination.mode {
        PaginationMode::None => Ok(UrlPlan::from_urls(config.start_urls.clone())),
        PaginationMode::Format => format_urls(pagination).map(UrlPlan::from_urls),
        PaginationMode::Link => {
            let mut plan = UrlPlan::default();
            for start_url in &config.start_urls {
                discover_links(start_url, pagination, fetcher, dry_run, &mut plan).await?;
            }
            Ok(plan)
        }
    }
}

/// Expands the URL template over the inclusive page range
pub fn format_urls(pagination: &PaginationConfig) -> ConfigResult<Vec<String>> {
    let template = pagination
        .url_template
        .as_deref()
        .ok_or_else(|| ConfigError::MissingKey("pagination.url_template".to_string()))?;

    let (start, end) = pagination.range();
    let urls = (start..=end)
        .map(|page| {
            expand_template(template, page).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "pagination.url_template '{}' must contain exactly one placeholder",
                    template
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!("Generated {} URLs from pagination template", urls.len());
    Ok(urls)
}

/// Follows next links from one start URL, appending to `plan`
///
/// Stops when a fetch fails, no next link is found, the next link was
/// already visited, or `max_pages` pages have been collected.
async fn discover_links(
    start_url: &str,
    pagination: &PaginationConfig,
    fetcher: &Fetcher,
    dry_run: bool,
    plan: &mut UrlPlan,
) -> ConfigResult<()> {
    let next_selector = pagination
        .next_selector
        .as_deref()
        .map(|s| compile_selector("pagination.next_selector", s))
        .transpose()?;

    let max_pages = pagination.max_pages.max(1);
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = start_url.to_string();

    while visited.len() < max_pages {
        let record = fetcher.fetch(&current).await;
        let Some(html) = record.html.filter(|html| !html.is_empty()) else {
            tracing::debug!("Stopping pagination at {}: fetch failed", current);
            break;
        };

        visited.insert(current.clone());
        plan.urls.push(current.clone());

        if dry_run {
            tracing::debug!("Dry run pagination: stopping after first page");
            plan.cache.insert(current, html);
            break;
        }

        let next = next_selector
            .as_ref()
            .and_then(|selector| find_next_link(&html, &current, selector));
        plan.cache.insert(current.clone(), html);

        match next {
            Some(next) if visited.contains(&next) => {
                tracing::debug!("Stopping pagination: {} already visited", next);
                break;
            }
            Some(next) => current = next,
            None => break,
        }
    }

    tracing::debug!(
        "Discovered {} paginated URLs starting from {}",
        visited.len(),
        start_url
    );
    Ok(())
}
