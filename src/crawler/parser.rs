//! HTML parser for extracting product records
//!
//! This module handles parsing listing pages to extract:
//! - One raw record per product container
//! - Field values as visible text or attribute values
//! - The "next page" link used by link pagination
//!
//! Parsing never fails. Malformed markup is parsed best-effort and missing
//! matches become absent fields.

use crate::cleaner::normalize_text;
use crate::config::{compile_selector, Extraction, ParsingConfig};
use crate::product::{RawRecord, RawValue};
use crate::url::{join_base_url, resolve_link};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// Attributes whose values are whitespace-separated token lists
const MULTI_VALUED_ATTRIBUTES: [&str; 6] =
    ["class", "rel", "rev", "accept-charset", "headers", "accesskey"];

#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    selector: Selector,
    attribute: Option<String>,
    join_base_url: bool,
}

/// Extracts raw product records from listing pages
///
/// Selectors are compiled once here and reused for every page.
#[derive(Debug, Clone)]
pub struct PageParser {
    container: Selector,
    fields: Vec<FieldRule>,
    base_url: Option<String>,
}

impl PageParser {
    /// Compiles the container and field selectors
    ///
    /// # Example
    ///
    /// ```
    /// use ecomscrape::config::{FieldSelector, ParsingConfig};
    /// use ecomscrape::crawler::PageParser;
    /// use indexmap::IndexMap;
    ///
    /// let mut fields = IndexMap::new();
    /// fields.insert(
    ///     "name".to_string(),
    ///     FieldSelector { selector: "h3".to_string(), attribute: None, join_base_url: false },
    /// );
    /// let parsing = ParsingConfig { product_container: "li.item".to_string(), fields };
    /// let parser = PageParser::new(&parsing, None).unwrap();
    ///
    /// let records = parser.parse("<ul><li class=item><h3> Lamp </h3></li></ul>", "https://shop/");
    /// assert_eq!(records[0].text("name").as_deref(), Some("Lamp"));
    /// ```
    pub fn new(parsing: &ParsingConfig, base_url: Option<String>) -> Result<Self, ConfigError> {
        let container = compile_selector("parsing.product_container", &parsing.product_container)?;

        let fields = parsing
            .fields
            .iter()
            .map(|(name, rule)| {
                let key = format!("parsing.fields.{}.selector", name);
                Ok(FieldRule {
                    name: name.clone(),
                    selector: compile_selector(&key, &rule.selector)?,
                    attribute: match rule.extraction() {
                        Extraction::Text => None,
                        Extraction::Attribute(attr) => Some(attr.to_string()),
                    },
                    join_base_url: rule.join_base_url,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            container,
            fields,
            base_url,
        })
    }

    /// Builds one raw record per product container on the page
    pub fn parse(&self, html: &str, source_url: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(html);

        let records: Vec<RawRecord> = document
            .select(&self.container)
            .map(|container| self.extract_record(container, source_url))
            .collect();

        tracing::debug!("Parsed {} containers from {}", records.len(), source_url);
        records
    }

    fn extract_record(&self, container: ElementRef<'_>, source_url: &str) -> RawRecord {
        let mut record = RawRecord::from_source(source_url);

        for rule in &self.fields {
            let Some(node) = container.select(&rule.selector).next() else {
                continue;
            };

            if let Some(value) = self.extract_value(node, rule) {
                record.insert(rule.name.clone(), value);
            }
        }

        record
    }

    fn extract_value(&self, node: ElementRef<'_>, rule: &FieldRule) -> Option<RawValue> {
        let value = match rule.attribute.as_deref() {
            None => RawValue::Text(element_text(node)),
            Some(attr) => {
                let raw = node.value().attr(attr)?;
                if MULTI_VALUED_ATTRIBUTES.contains(&attr.to_ascii_lowercase().as_str()) {
                    RawValue::List(raw.split_whitespace().map(str::to_string).collect())
                } else {
                    RawValue::Text(raw.trim().to_string())
                }
            }
        };

        match value {
            RawValue::Text(text) if rule.join_base_url && !text.is_empty() => Some(
                RawValue::Text(join_base_url(self.base_url.as_deref(), &text)),
            ),
            other => Some(other),
        }
    }
}

/// Visible text of a node: trimmed text pieces joined by single spaces
fn element_text(node: ElementRef<'_>) -> String {
    let joined = node
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_text(&joined)
}

/// Finds the "next page" link on a listing page
///
/// Returns None when no node matches, the first match has no usable href,
/// or the href does not resolve to an HTTP(S) URL.
pub fn find_next_link(html: &str, page_url: &str, next: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let node = document.select(next).next()?;
    let href = node.value().attr("href")?;
    resolve_link(href, page_url)
}
