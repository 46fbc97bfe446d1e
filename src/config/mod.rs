//! Configuration module for EcomScrape
//!
//! This module handles loading, parsing, and validating site configuration
//! files written in YAML, JSON or TOML.
//!
//! # Example
//!
//! ```no_run
//! use ecomscrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("configs/books.yaml")).unwrap();
//! println!("Container selector: {}", config.parsing.product_container);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_user_agents, CleaningConfig, Extraction, FieldSelector, PaginationConfig,
    PaginationMode, ParsingConfig, RequestSettings, SiteConfig, DEFAULT_USER_AGENTS,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, ConfigFormat,
};
pub use validation::validate;
pub(crate) use validation::compile_selector;
