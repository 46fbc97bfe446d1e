//! EcomScrape: a config-driven e-commerce listing scraper
//!
//! This crate plans listing-page URLs for a site, fetches them politely with
//! retry and backoff, extracts product containers with CSS selectors, cleans
//! the raw fields into typed product records and hands the batch to a sink.

pub mod cleaner;
pub mod config;
pub mod crawler;
pub mod output;
pub mod product;
pub mod server;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for EcomScrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run transition: {from} -> {to}")]
    InvalidTransition {
        from: state::RunStage,
        to: state::RunStage,
    },
}

/// Configuration-specific errors
///
/// Every variant is raised before any network activity takes place.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported config extension: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing required config key: {0}")]
    MissingKey(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {key} ('{selector}'): {reason}")]
    InvalidSelector {
        key: String,
        selector: String,
        reason: String,
    },

    #[error("Invalid request header '{0}'")]
    InvalidHeader(String),
}

/// Result type alias for EcomScrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cleaner::{clean_products, Cleaner};
pub use config::SiteConfig;
pub use crawler::{Coordinator, FetchRecord, Fetcher, RunOptions, RunReport};
pub use product::{Product, RawRecord, RawValue};
