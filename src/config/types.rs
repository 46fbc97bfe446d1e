use indexmap::IndexMap;
use serde::Deserialize;

/// User agents used when a site config does not supply its own pool
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36",
];

/// Crawl, parse and clean rules for one site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub site_name: String,

    /// Listing pages to start from, in crawl order
    pub start_urls: Vec<String>,

    /// Base used when a field asks for relative URLs to be resolved
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub request: RequestSettings,

    pub parsing: ParsingConfig,

    #[serde(default)]
    pub pagination: Option<PaginationConfig>,

    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Currency code stamped on products that do not carry their own
    #[serde(default)]
    pub currency: Option<String>,

    /// Global cap on the number of products kept from one run; 0 means no cap
    #[serde(default)]
    pub max_products: Option<usize>,
}

/// HTTP behaviour for the fetcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    /// Per-request timeout (seconds)
    pub timeout: f64,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Backoff before retry n is `backoff_factor * 2^(n-1)` seconds
    pub backoff_factor: f64,

    /// Pause after every request (seconds)
    pub delay_between_requests: f64,

    /// Concurrent fetches for batch fetching
    pub max_workers: usize,

    /// Status codes that trigger a retry
    pub retry_status_forcelist: Vec<u16>,

    /// Pool the User-Agent header is picked from
    pub user_agents: Vec<String>,

    /// Static headers sent with every request
    pub headers: IndexMap<String, String>,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: 10.0,
            max_retries: 3,
            backoff_factor: 0.5,
            delay_between_requests: 0.0,
            max_workers: 1,
            retry_status_forcelist: vec![429, 500, 502, 503, 504],
            user_agents: default_user_agents(),
            headers: IndexMap::new(),
        }
    }
}

pub fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

/// How listing pages beyond the start URLs are found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// Crawl the start URLs only
    #[default]
    None,

    /// Expand a numbered URL template
    Format,

    /// Follow "next page" links
    Link,
}

/// Pagination settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    #[serde(default)]
    pub mode: PaginationMode,

    /// CSS selector of the "next page" anchor (link mode)
    #[serde(default)]
    pub next_selector: Option<String>,

    /// Hard cap on pages followed per start URL (link mode)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Template with a single `{}` or `{0}` placeholder (format mode)
    #[serde(default)]
    pub url_template: Option<String>,

    #[serde(default)]
    pub start: Option<i64>,

    #[serde(default)]
    pub end: Option<i64>,
}

fn default_max_pages() -> usize {
    20
}

impl PaginationConfig {
    /// Inclusive page range for format mode, `end` defaulting to `start`
    pub fn range(&self) -> (i64, i64) {
        let start = self.start.unwrap_or(1);
        let end = self.end.unwrap_or(start);
        (start, end)
    }
}

/// Site-specific overrides for the cleaner's lookup tables
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Word to rating overrides, e.g. `three: 3`
    pub rating_words: IndexMap<String, f64>,

    /// Phrase to canonical availability overrides, e.g. `"ships soon": preorder`
    pub availability_map: IndexMap<String, String>,
}

/// Where product containers are and how to read their fields
#[derive(Debug, Clone, Deserialize)]
pub struct ParsingConfig {
    /// Selector matching one node per product
    pub product_container: String,

    /// Logical field name to extraction rule
    pub fields: IndexMap<String, FieldSelector>,
}

/// Extraction rule for one field
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSelector {
    /// Selector evaluated inside the container; the first match wins
    pub selector: String,

    /// Attribute to read; absent or `"text"` reads the visible text
    #[serde(default)]
    pub attribute: Option<String>,

    /// Resolve the extracted value against the site base URL
    #[serde(default)]
    pub join_base_url: bool,
}

/// What a field rule reads from the matched node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction<'a> {
    Text,
    Attribute(&'a str),
}

impl FieldSelector {
    pub fn extraction(&self) -> Extraction<'_> {
        match self.attribute.as_deref() {
            None | Some("text") => Extraction::Text,
            Some(name) => Extraction::Attribute(name),
        }
    }
}
