//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building the HTTP client
//! - Per-request header selection (static headers plus a rotated User-Agent)
//! - Retry with exponential backoff for retryable statuses and transport errors
//! - Politeness delay after every request
//! - Bounded concurrent batch fetching
//!
//! Fetching never fails: every call produces a [`FetchRecord`], with the
//! failure reason encoded in it.

use crate::config::RequestSettings;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Why a fetch produced no HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The request exceeded the configured timeout
    Timeout,

    /// Connection refused, DNS failure, TLS error
    Connect(String),

    /// Final response had a non-success status
    Status(u16),

    /// Headers arrived but the body could not be read
    Body(String),

    /// Any other request error
    Request(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Connect(e) => write!(f, "connection failed: {}", e),
            Self::Status(code) => match StatusCode::from_u16(*code)
                .ok()
                .and_then(|s| s.canonical_reason())
            {
                Some(reason) => write!(f, "HTTP {} {}", code, reason),
                None => write!(f, "HTTP {}", code),
            },
            Self::Body(e) => write!(f, "failed to read body: {}", e),
            Self::Request(e) => write!(f, "request failed: {}", e),
        }
    }
}

impl std::error::Error for FetchFailure {}

impl FetchFailure {
    fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }

    /// Transport failures worth another attempt
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect(_))
    }
}

/// Result of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchRecord {
    /// The URL that was requested
    pub url: String,

    /// Page body, absent on failure
    pub html: Option<String>,

    /// Headers sent with the request
    pub headers: BTreeMap<String, String>,

    /// Final HTTP status, absent on failure
    pub status_code: Option<u16>,

    /// Failure reason, absent on success
    pub error: Option<FetchFailure>,
}

impl FetchRecord {
    pub fn is_success(&self) -> bool {
        self.html.as_deref().is_some_and(|html| !html.is_empty())
    }
}

/// Cumulative request outcome counts for one fetcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Records that carried a non-empty body
    pub successes: usize,

    /// Distinct URLs that failed at least once
    pub failures: usize,
}

/// Picks the User-Agent for one request
pub trait UserAgentPicker: Send + Sync {
    /// Returns an index into `pool`; `pool` is never empty
    fn pick(&self, pool: &[String]) -> usize;
}

/// Uniformly random choice from the pool
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUserAgent;

impl UserAgentPicker for RandomUserAgent {
    fn pick(&self, pool: &[String]) -> usize {
        rand::rng().random_range(0..pool.len())
    }
}

/// Always the same pool entry, for reproducible requests
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedUserAgent(pub usize);

impl UserAgentPicker for FixedUserAgent {
    fn pick(&self, pool: &[String]) -> usize {
        self.0 % pool.len()
    }
}

/// Append-only log shared by concurrent fetches
#[derive(Debug, Default)]
struct FetchLog {
    successes: usize,
    failed_urls: HashSet<String>,
}

/// Builds the HTTP client used by every fetch
///
/// Timeouts are applied per request, so the client itself only carries
/// connection-level settings.
///
/// # Example
///
/// ```no_run
/// use ecomscrape::crawler::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages according to a site's request settings
///
/// Cloning is cheap; clones share the client, picker and outcome log.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    settings: Arc<RequestSettings>,
    picker: Arc<dyn UserAgentPicker>,
    log: Arc<Mutex<FetchLog>>,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher with random User-Agent rotation
    pub fn new(settings: RequestSettings) -> Result<Self, reqwest::Error> {
        Self::with_picker(settings, Arc::new(RandomUserAgent))
    }

    /// Creates a fetcher with a custom User-Agent picker
    pub fn with_picker(
        settings: RequestSettings,
        picker: Arc<dyn UserAgentPicker>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
            settings: Arc::new(settings),
            picker,
            log: Arc::new(Mutex::new(FetchLog::default())),
        })
    }

    pub fn settings(&self) -> &RequestSettings {
        &self.settings
    }

    /// Static headers plus one User-Agent from the pool
    fn choose_headers(&self) -> BTreeMap<String, String> {
        let mut headers: BTreeMap<String, String> = self
            .settings
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(agent) = self.pick_user_agent() {
            headers.retain(|name, _| !name.eq_ignore_ascii_case(USER_AGENT.as_str()));
            headers.insert(USER_AGENT.as_str().to_string(), agent);
        }

        headers
    }

    fn pick_user_agent(&self) -> Option<String> {
        let pool = &self.settings.user_agents;
        if pool.is_empty() {
            return None;
        }
        pool.get(self.picker.pick(pool)).cloned()
    }

    /// Backoff before retry `attempt` (1-based)
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let seconds = self.settings.backoff_factor * 2f64.powi(exponent);
        Duration::from_secs_f64(seconds.max(0.0))
    }

    /// Fetches a single URL
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Status in `retry_status_forcelist` | Retry with backoff |
    /// | Timeout / connection failure | Retry with backoff |
    /// | Other non-2xx status | Immediate failure |
    /// | Retries exhausted | Failure with the last status or error |
    ///
    /// After the final attempt the fetcher sleeps `delay_between_requests`,
    /// whether the fetch succeeded or not.
    pub async fn fetch(&self, url: &str) -> FetchRecord {
        let headers = self.choose_headers();
        tracing::trace!(
            "Requesting {} with User-Agent '{}'",
            url,
            headers
                .get(USER_AGENT.as_str())
                .map(String::as_str)
                .unwrap_or("")
        );

        let outcome = self.fetch_with_retries(url, &headers).await;

        let record = match outcome {
            Ok((status, html)) => FetchRecord {
                url: url.to_string(),
                html: Some(html),
                headers,
                status_code: Some(status),
                error: None,
            },
            Err(failure) => {
                tracing::warn!("Request failed for {}: {}", url, failure);
                FetchRecord {
                    url: url.to_string(),
                    html: None,
                    headers,
                    status_code: None,
                    error: Some(failure),
                }
            }
        };

        self.log_outcome(&record);

        if self.settings.delay_between_requests > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(
                self.settings.delay_between_requests,
            ))
            .await;
        }

        record
    }

    async fn fetch_with_retries(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(u16, String), FetchFailure> {
        let header_map = to_header_map(headers);
        let timeout = Duration::from_secs_f64(self.settings.timeout);
        let mut attempt: u32 = 0;

        loop {
            let result = self
                .client
                .get(url)
                .headers(header_map.clone())
                .timeout(timeout)
                .send()
                .await;

            let retries_left = attempt < self.settings.max_retries;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let retryable = self
                        .settings
                        .retry_status_forcelist
                        .contains(&status.as_u16());

                    if retryable && retries_left {
                        attempt += 1;
                        tracing::debug!(
                            "HTTP {} from {}, retry {}/{}",
                            status.as_u16(),
                            url,
                            attempt,
                            self.settings.max_retries
                        );
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(FetchFailure::Status(status.as_u16()));
                    }

                    return match response.text().await {
                        Ok(body) => Ok((status.as_u16(), body)),
                        Err(e) => Err(FetchFailure::Body(e.to_string())),
                    };
                }
                Err(e) => {
                    let failure = FetchFailure::from_reqwest(&e);
                    if failure.is_retryable() && retries_left {
                        attempt += 1;
                        tracing::debug!(
                            "{} for {}, retry {}/{}",
                            failure,
                            url,
                            attempt,
                            self.settings.max_retries
                        );
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                    return Err(failure);
                }
            }
        }
    }

    fn log_outcome(&self, record: &FetchRecord) {
        let mut log = match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if record.is_success() {
            log.successes += 1;
        } else if record.error.is_some() {
            log.failed_urls.insert(record.url.clone());
        }
    }

    /// Fetches many URLs
    ///
    /// With `max_workers <= 1` URLs are fetched one by one and records come
    /// back in input order. Otherwise up to `max_workers` fetches run at once
    /// and records are collected as they complete, so their order is
    /// unspecified.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<FetchRecord> {
        let mut results = Vec::with_capacity(urls.len());

        if self.settings.max_workers <= 1 {
            for url in urls {
                results.push(self.fetch(url).await);
            }
            return results;
        }

        tracing::debug!(
            "Fetching {} URLs with max_workers={}",
            urls.len(),
            self.settings.max_workers
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.max_workers));
        let mut tasks = JoinSet::new();

        for url in urls {
            let fetcher = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let url = url.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                fetcher.fetch(&url).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(record) => results.push(record),
                Err(e) => tracing::warn!("Fetch task failed: {}", e),
            }
        }

        results
    }

    /// Success and failure counts across every fetch made by this fetcher
    pub fn summary(&self) -> FetchSummary {
        let log = match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        FetchSummary {
            successes: log.successes,
            failures: log.failed_urls.len(),
        }
    }
}

fn to_header_map(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid header '{}'", name),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings() -> RequestSettings {
        RequestSettings {
            timeout: 5.0,
            max_retries: 2,
            backoff_factor: 0.0,
            delay_between_requests: 0.0,
            max_workers: 1,
            retry_status_forcelist: vec![500, 502, 503, 504],
            user_agents: vec!["AgentA".to_string(), "AgentB".to_string()],
            headers: IndexMap::from([("Accept-Language".to_string(), "en-GB".to_string())]),
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client().is_ok());
    }

    #[test]
    fn test_backoff_doubles() {
        let mut settings = test_settings();
        settings.backoff_factor = 0.5;
        let fetcher = Fetcher::new(settings).unwrap();

        assert_eq!(fetcher.backoff(1), Duration::from_millis(500));
        assert_eq!(fetcher.backoff(2), Duration::from_millis(1000));
        assert_eq!(fetcher.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_fixed_picker_pins_headers() {
        let fetcher =
            Fetcher::with_picker(test_settings(), Arc::new(FixedUserAgent(1))).unwrap();
        let headers = fetcher.choose_headers();

        assert_eq!(headers.get("user-agent").map(String::as_str), Some("AgentB"));
        assert_eq!(
            headers.get("Accept-Language").map(String::as_str),
            Some("en-GB")
        );
    }

    #[test]
    fn test_rotated_agent_replaces_static_user_agent() {
        let mut settings = test_settings();
        settings
            .headers
            .insert("User-Agent".to_string(), "StaticAgent".to_string());
        let fetcher = Fetcher::with_picker(settings, Arc::new(FixedUserAgent(0))).unwrap();
        let headers = fetcher.choose_headers();

        let agents: Vec<&str> = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(agents, vec!["AgentA"]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_random_picker_stays_in_pool() {
        let pool = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        for _ in 0..50 {
            assert!(RandomUserAgent.pick(&pool) < pool.len());
        }
    }

    #[tokio::test]
    async fn test_fetch_success_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page-1"))
            .and(header("user-agent", "AgentA"))
            .and(header("accept-language", "en-GB"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher =
            Fetcher::with_picker(test_settings(), Arc::new(FixedUserAgent(0))).unwrap();
        let record = fetcher.fetch(&format!("{}/page-1", server.uri())).await;

        assert_eq!(record.html.as_deref(), Some("<html>ok</html>"));
        assert_eq!(record.status_code, Some(200));
        assert!(record.error.is_none());
        assert_eq!(
            fetcher.summary(),
            FetchSummary {
                successes: 1,
                failures: 0
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_exhausts_retries_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_settings()).unwrap();
        let record = fetcher.fetch(&format!("{}/down", server.uri())).await;

        assert!(record.html.is_none());
        assert_eq!(record.status_code, None);
        assert_eq!(record.error, Some(FetchFailure::Status(503)));
        assert!(record.error.unwrap().to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_settings()).unwrap();
        let record = fetcher.fetch(&format!("{}/missing", server.uri())).await;
        assert_eq!(record.error, Some(FetchFailure::Status(404)));
    }

    #[tokio::test]
    async fn test_delay_follows_every_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let mut settings = test_settings();
        settings.delay_between_requests = 0.2;
        let fetcher = Fetcher::new(settings).unwrap();

        for route in ["/missing", "/ok"] {
            let started = std::time::Instant::now();
            fetcher.fetch(&format!("{}{}", server.uri(), route)).await;
            assert!(
                started.elapsed() >= Duration::from_millis(200),
                "{} returned after {:?}",
                route,
                started.elapsed()
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_settings()).unwrap();
        let record = fetcher.fetch(&format!("{}/flaky", server.uri())).await;
        assert_eq!(record.html.as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_recorded() {
        let mut settings = test_settings();
        settings.max_retries = 0;
        let fetcher = Fetcher::new(settings).unwrap();

        // Port 9 (discard) is not listening on loopback in test environments
        let record = fetcher.fetch("http://127.0.0.1:9/").await;
        assert!(record.html.is_none());
        assert!(record.error.is_some());
        assert_eq!(fetcher.summary().failures, 1);
    }

    #[tokio::test]
    async fn test_summary_counts_distinct_failed_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(test_settings()).unwrap();
        let gone = format!("{}/gone", server.uri());
        fetcher.fetch(&gone).await;
        fetcher.fetch(&gone).await;
        fetcher.fetch(&format!("{}/ok", server.uri())).await;

        assert_eq!(
            fetcher.summary(),
            FetchSummary {
                successes: 1,
                failures: 1
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_all_sequential_keeps_order() {
        let server = MockServer::start().await;
        for page in 1..=3 {
            Mock::given(method("GET"))
                .and(path(format!("/page-{}", page)))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!("page {}", page)))
                .mount(&server)
                .await;
        }

        let fetcher = Fetcher::new(test_settings()).unwrap();
        let urls: Vec<String> = (1..=3)
            .map(|p| format!("{}/page-{}", server.uri(), p))
            .collect();
        let records = fetcher.fetch_all(&urls).await;

        let fetched: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        let expected: Vec<&str> = urls.iter().map(String::as_str).collect();
        assert_eq!(fetched, expected);
    }

    #[tokio::test]
    async fn test_fetch_all_concurrent_returns_every_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fast"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut settings = test_settings();
        settings.max_workers = 3;
        let fetcher = Fetcher::new(settings).unwrap();

        let urls = vec![
            format!("{}/slow", server.uri()),
            format!("{}/fast", server.uri()),
            format!("{}/broken", server.uri()),
        ];
        let records = fetcher.fetch_all(&urls).await;

        assert_eq!(records.len(), 3);
        let mut fetched: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
        fetched.sort();
        let mut expected = urls.clone();
        expected.sort();
        assert_eq!(fetched, expected);

        // Completion order: the delayed page cannot finish first
        assert_ne!(records[0].url, urls[0]);
        assert_eq!(
            fetcher.summary(),
            FetchSummary {
                successes: 2,
                failures: 1
            }
        );
    }
}
