//! URL helpers for pagination and field extraction
//!
//! This module provides:
//! - Page-number templates (`{}` / `{0}` placeholders) for format pagination
//! - Resolution of "next page" hrefs against the page they were found on
//! - Base-URL joining for extracted relative links

use url::Url;

const PLACEHOLDERS: [&str; 2] = ["{}", "{0}"];

/// Counts page-number placeholders in a URL template
///
/// # Examples
///
/// ```
/// use ecomscrape::url::count_placeholders;
///
/// assert_eq!(count_placeholders("https://site/page/{0}"), 1);
/// assert_eq!(count_placeholders("https://site/page-{}.html"), 1);
/// assert_eq!(count_placeholders("https://site/page/"), 0);
/// ```
pub fn count_placeholders(template: &str) -> usize {
    PLACEHOLDERS
        .iter()
        .map(|p| template.matches(p).count())
        .sum()
}

/// Substitutes a page number into a template
///
/// Returns `None` unless the template holds exactly one placeholder.
///
/// # Examples
///
/// ```
/// use ecomscrape::url::expand_template;
///
/// assert_eq!(
///     expand_template("https://site/page/{0}", 2),
///     Some("https://site/page/2".to_string())
/// );
/// assert_eq!(expand_template("https://site/{}/{}", 2), None);
/// ```
pub fn expand_template(template: &str, page: i64) -> Option<String> {
    if count_placeholders(template) != 1 {
        return None;
    }

    PLACEHOLDERS
        .iter()
        .find(|p| template.contains(*p))
        .map(|p| template.replacen(p, &page.to_string(), 1))
}

/// Resolves a "next page" href against the page it was found on
///
/// Returns None if the link cannot lead to another listing page:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel:, data: schemes
/// - non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let base = Url::parse(page_url).ok()?;
    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

/// Joins an extracted value onto the site base URL
///
/// Absolute values pass through; without a usable base the value is kept as-is.
pub fn join_base_url(base: Option<&str>, value: &str) -> String {
    if let Ok(absolute) = Url::parse(value) {
        return absolute.to_string();
    }

    base.and_then(|b| Url::parse(b).ok())
        .and_then(|b| b.join(value).ok())
        .map(|joined| joined.to_string())
        .unwrap_or_else(|| value.to_string())
}
