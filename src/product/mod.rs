//! Product records
//!
//! - `RawRecord`: one map of extracted strings per product container
//! - `Product`: the cleaned, typed record handed to sinks and the snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the synthetic field naming the page a record was scraped from
pub const SOURCE_URL_FIELD: &str = "source_url";

/// A raw field value as extracted from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),

    /// Multi-token values such as a split class list
    List(Vec<String>),
}

impl RawValue {
    /// Flattens the value into one string, list tokens joined by spaces
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(tokens) => tokens.join(" "),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field name to raw value for one product container
///
/// Fields whose selector matched nothing are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a record carrying the page it came from
    pub fn from_source(source_url: &str) -> Self {
        let mut record = Self::new();
        record.insert(SOURCE_URL_FIELD, source_url);
        record
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style insert, mostly for tests and fixtures
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    /// Text of a field, treating empty strings as absent
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(RawValue::as_text)
            .filter(|text| !text.is_empty())
    }

    /// First non-empty text among the given field names
    pub fn first_text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.text(name))
    }

    pub fn source_url(&self) -> Option<String> {
        self.text(SOURCE_URL_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A cleaned product
///
/// Serialized field names are the export column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// First 12 hex characters of the identity hash
    pub id: String,
    pub title: Option<String>,
    pub name: Option<String>,
    pub price_current: Option<f64>,
    pub price_original: Option<f64>,
    /// 0 to 5, fractional allowed
    pub rating: Option<f64>,
    /// `in_stock`, `out_of_stock`, `preorder` or `unknown`
    pub availability: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub product_url: Option<String>,
    pub source_url: Option<String>,
    pub category: String,
    pub currency: Option<String>,
    pub review_count: Option<u64>,
    /// RFC 3339 capture time shared by the whole batch
    pub scraped_at: String,
    pub description: Option<String>,
}

impl Product {
    /// Export column names, in serialization order
    pub const COLUMNS: [&'static str; 16] = [
        "id",
        "title",
        "name",
        "price_current",
        "price_original",
        "rating",
        "availability",
        "image_url",
        "url",
        "product_url",
        "source_url",
        "category",
        "currency",
        "review_count",
        "scraped_at",
        "description",
    ];

    /// Current price, falling back to the original price
    pub fn effective_price(&self) -> Option<f64> {
        self.price_current.or(self.price_original)
    }
}
