use crate::config::types::{default_user_agents, SiteConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Config file syntaxes understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Picks the syntax from the file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Loads, normalizes and validates a site configuration file
///
/// # Arguments
///
/// * `path` - Path to a `.yaml`, `.yml`, `.json` or `.toml` file
///
/// # Returns
///
/// * `Ok(SiteConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Missing file, bad syntax, missing key or failed validation
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ecomscrape::config::load_config;
///
/// let config = load_config(Path::new("configs/books.yaml")).unwrap();
/// println!("Scraping {}", config.site_name);
/// ```
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content, format)?;

    tracing::debug!(
        "Loaded config for site '{}' from {}",
        config.site_name,
        path.display()
    );

    Ok(config)
}

/// Parses configuration text in the given syntax, then normalizes and validates it
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<SiteConfig, ConfigError> {
    let mut config: SiteConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };

    normalize(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Fills defaults that serde cannot express on its own
fn normalize(config: &mut SiteConfig) {
    if config.request.user_agents.is_empty() {
        config.request.user_agents = default_user_agents();
    }

    if let Some(base) = &config.base_url {
        if base.trim().is_empty() {
            config.base_url = None;
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so an export can be traced back to the exact rules
/// that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(SiteConfig, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
