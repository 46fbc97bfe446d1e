use crate::config::types::{
    PaginationConfig, PaginationMode, ParsingConfig, RequestSettings, SiteConfig,
};
use crate::url::count_placeholders;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_site(config)?;
    validate_request_settings(&config.request)?;
    validate_parsing(&config.parsing)?;
    if let Some(pagination) = &config.pagination {
        validate_pagination(pagination)?;
    }
    Ok(())
}

fn validate_site(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.site_name.trim().is_empty() {
        return Err(ConfigError::MissingKey("site_name".to_string()));
    }

    if config.start_urls.is_empty() {
        return Err(ConfigError::Validation(
            "start_urls must be a non-empty list".to_string(),
        ));
    }

    for start in &config.start_urls {
        Url::parse(start)
            .map_err(|e| ConfigError::InvalidUrl(format!("start_urls '{}': {}", start, e)))?;
    }

    if let Some(base) = &config.base_url {
        Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl(format!("base_url '{}': {}", base, e)))?;
    }

    Ok(())
}

fn validate_request_settings(settings: &RequestSettings) -> Result<(), ConfigError> {
    if settings.timeout <= 0.0 || !settings.timeout.is_finite() {
        return Err(ConfigError::Validation(format!(
            "request.timeout must be a positive number of seconds, got {}",
            settings.timeout
        )));
    }

    if settings.backoff_factor < 0.0 || !settings.backoff_factor.is_finite() {
        return Err(ConfigError::Validation(format!(
            "request.backoff_factor must be >= 0, got {}",
            settings.backoff_factor
        )));
    }

    if settings.delay_between_requests < 0.0 || !settings.delay_between_requests.is_finite() {
        return Err(ConfigError::Validation(format!(
            "request.delay_between_requests must be >= 0, got {}",
            settings.delay_between_requests
        )));
    }

    if settings.max_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "request.max_workers must be >= 1, got {}",
            settings.max_workers
        )));
    }

    for (name, value) in &settings.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
        HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
    }

    for agent in &settings.user_agents {
        HeaderValue::from_str(agent)
            .map_err(|_| ConfigError::InvalidHeader(format!("User-Agent: {}", agent)))?;
    }

    Ok(())
}

fn validate_parsing(parsing: &ParsingConfig) -> Result<(), ConfigError> {
    if parsing.product_container.trim().is_empty() {
        return Err(ConfigError::MissingKey(
            "parsing.product_container".to_string(),
        ));
    }
    validate_selector("parsing.product_container", &parsing.product_container)?;

    if parsing.fields.is_empty() {
        return Err(ConfigError::MissingKey("parsing.fields".to_string()));
    }

    for (name, field) in &parsing.fields {
        let key = format!("parsing.fields.{}.selector", name);
        if field.selector.trim().is_empty() {
            return Err(ConfigError::MissingKey(key));
        }
        validate_selector(&key, &field.selector)?;
    }

    Ok(())
}

fn validate_pagination(pagination: &PaginationConfig) -> Result<(), ConfigError> {
    match pagination.mode {
        PaginationMode::None => Ok(()),
        PaginationMode::Format => {
            let template = pagination.url_template.as_deref().ok_or_else(|| {
                ConfigError::MissingKey("pagination.url_template".to_string())
            })?;

            let placeholders = count_placeholders(template);
            if placeholders != 1 {
                return Err(ConfigError::Validation(format!(
                    "pagination.url_template must contain exactly one '{{}}' placeholder, found {}",
                    placeholders
                )));
            }

            let (start, end) = pagination.range();
            if end < start {
                return Err(ConfigError::Validation(format!(
                    "pagination.end ({}) must be >= pagination.start ({})",
                    end, start
                )));
            }
            Ok(())
        }
        PaginationMode::Link => {
            if pagination.max_pages < 1 {
                return Err(ConfigError::Validation(
                    "pagination.max_pages must be >= 1".to_string(),
                ));
            }
            if let Some(selector) = &pagination.next_selector {
                validate_selector("pagination.next_selector", selector)?;
            }
            Ok(())
        }
    }
}

/// Checks that a CSS selector compiles
fn validate_selector(key: &str, selector: &str) -> Result<(), ConfigError> {
    compile_selector(key, selector).map(|_| ())
}

/// Compiles a CSS selector, naming the config key on failure
pub(crate) fn compile_selector(key: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        key: key.to_string(),
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
