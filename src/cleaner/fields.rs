//! Normalizers for individual raw fields
//!
//! Every function here degrades to `None` on input it cannot interpret;
//! none of them return errors.

use crate::product::RawValue;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Built-in rating words, in match order
pub const DEFAULT_RATING_WORDS: [(&str, f64); 6] = [
    ("zero", 0.0),
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
];

/// Built-in availability phrases, in match order
pub const DEFAULT_AVAILABILITY: [(&str, &str); 6] = [
    ("in stock", "in_stock"),
    ("available", "in_stock"),
    ("out of stock", "out_of_stock"),
    ("out-of-stock", "out_of_stock"),
    ("pre-order", "preorder"),
    ("preorder", "preorder"),
];

/// Availability for non-empty text that matches no phrase
pub const UNKNOWN_AVAILABILITY: &str = "unknown";

static PRICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?\d[\d,]*(?:\.\d+)?").expect("hardcoded regex pattern is valid")
});

static DIGITS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("hardcoded regex pattern is valid"));

static RATING_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("hardcoded regex pattern is valid"));

/// Replaces non-breaking spaces and collapses runs of whitespace
pub fn normalize_text(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word-to-rating lookup, site overrides layered over the defaults
#[derive(Debug, Clone)]
pub struct RatingWords {
    entries: Vec<(String, f64)>,
}

impl RatingWords {
    pub fn new(overrides: &IndexMap<String, f64>) -> Self {
        let mut entries: Vec<(String, f64)> = DEFAULT_RATING_WORDS
            .iter()
            .map(|(word, value)| (word.to_string(), *value))
            .collect();

        for (word, value) in overrides {
            let word = word.trim().to_lowercase();
            match entries.iter_mut().find(|entry| entry.0 == word) {
                Some(entry) => entry.1 = *value,
                None => entries.push((word, *value)),
            }
        }

        Self { entries }
    }

    fn exact(&self, token: &str) -> Option<f64> {
        let token = token.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, value)| *value)
    }

    fn contained_in(&self, lowered: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(word, _)| !word.is_empty() && lowered.contains(word.as_str()))
            .map(|(_, value)| *value)
    }
}

impl Default for RatingWords {
    fn default() -> Self {
        Self::new(&IndexMap::new())
    }
}

/// Phrase-to-canonical-status lookup; site overrides are checked first
#[derive(Debug, Clone)]
pub struct AvailabilityMap {
    entries: Vec<(String, String)>,
}

impl AvailabilityMap {
    pub fn new(overrides: &IndexMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = overrides
            .iter()
            .map(|(phrase, status)| (phrase.trim().to_lowercase(), status.clone()))
            .filter(|(phrase, _)| !phrase.is_empty())
            .collect();

        for (phrase, status) in DEFAULT_AVAILABILITY {
            if !entries.iter().any(|(existing, _)| existing == phrase) {
                entries.push((phrase.to_string(), status.to_string()));
            }
        }

        Self { entries }
    }
}

impl Default for AvailabilityMap {
    fn default() -> Self {
        Self::new(&IndexMap::new())
    }
}

/// Extracts the first signed decimal number, ignoring symbols and thousands separators
///
/// # Examples
///
/// ```
/// use ecomscrape::cleaner::clean_price;
///
/// assert_eq!(clean_price("£1,234.50"), Some(1234.5));
/// assert_eq!(clean_price("Price: -3"), Some(-3.0));
/// assert_eq!(clean_price("call us"), None);
/// ```
pub fn clean_price(raw: &str) -> Option<f64> {
    let text = normalize_text(raw);
    let found = PRICE_REGEX.find(&text)?;
    found.as_str().replace(',', "").parse::<f64>().ok()
}

/// Extracts the first run of digits, e.g. `"1,024 reviews"` -> 1024
pub fn clean_review_count(raw: &str) -> Option<u64> {
    let text = normalize_text(raw).replace(',', "");
    let found = DIGITS_REGEX.find(&text)?;
    found.as_str().parse::<u64>().ok()
}

/// Reads a rating from a numeric literal or a rating word
///
/// Lists (e.g. class tokens) are scanned token by token against the word
/// table before falling back to the text rules.
pub fn clean_rating(raw: &RawValue, words: &RatingWords) -> Option<f64> {
    if let RawValue::List(tokens) = raw {
        if let Some(value) = tokens.iter().find_map(|token| words.exact(token)) {
            return Some(value);
        }
    }

    let text = normalize_text(&raw.as_text());
    if let Some(number) = RATING_NUMBER_REGEX.find(&text) {
        if let Ok(value) = number.as_str().parse::<f64>() {
            return Some(value);
        }
    }

    words.contained_in(&text.to_lowercase())
}

/// Maps free-form availability text onto a canonical token
///
/// Returns `None` for empty input and `"unknown"` when nothing matches.
pub fn standardize_availability(raw: &str, map: &AvailabilityMap) -> Option<String> {
    let lowered = normalize_text(raw).to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let status = map
        .entries
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase.as_str()))
        .map(|(_, status)| status.clone())
        .unwrap_or_else(|| UNKNOWN_AVAILABILITY.to_string());

    Some(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(tokens: &[&str]) -> RawValue {
        RawValue::List(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_patterns_compile() {
        assert!(PRICE_REGEX.is_match("£1,299.99"));
        assert!(DIGITS_REGEX.is_match("42 reviews"));
        assert!(RATING_NUMBER_REGEX.is_match("4.5 out of 5"));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  In\u{a0}stock \n\t now "), "In stock now");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_clean_price_with_symbols_and_separators() {
        assert_eq!(clean_price("£1,234.50"), Some(1234.50));
        assert_eq!(clean_price("$ 12"), Some(12.0));
        assert_eq!(clean_price("€\u{a0}45.17"), Some(45.17));
        assert_eq!(clean_price("from 9.99 to 19.99"), Some(9.99));
        assert_eq!(clean_price("+5.5"), Some(5.5));
    }

    #[test]
    fn test_clean_price_unparseable() {
        assert_eq!(clean_price(""), None);
        assert_eq!(clean_price("Sold out"), None);
    }

    #[test]
    fn test_clean_review_count() {
        assert_eq!(clean_review_count("1,024 reviews"), Some(1024));
        assert_eq!(clean_review_count("(37)"), Some(37));
        assert_eq!(clean_review_count("no reviews yet"), None);
    }

    #[test]
    fn test_rating_list_matches_regardless_of_order_and_case() {
        let words = RatingWords::default();
        assert_eq!(clean_rating(&list(&["star-rating", "Three"]), &words), Some(3.0));
        assert_eq!(clean_rating(&list(&["THREE", "star-rating"]), &words), Some(3.0));
        assert_eq!(clean_rating(&list(&["star-rating", "five"]), &words), Some(5.0));
    }

    #[test]
    fn test_rating_text_prefers_numbers() {
        let words = RatingWords::default();
        assert_eq!(clean_rating(&"4.5 out of 5".into(), &words), Some(4.5));
        assert_eq!(clean_rating(&"Rated two stars".into(), &words), Some(2.0));
        assert_eq!(clean_rating(&"star-rating Three".into(), &words), Some(3.0));
        assert_eq!(clean_rating(&"not rated".into(), &words), None);
    }

    #[test]
    fn test_rating_overrides() {
        let mut overrides = IndexMap::new();
        overrides.insert("Excellent".to_string(), 5.0);
        overrides.insert("three".to_string(), 3.5);
        let words = RatingWords::new(&overrides);

        assert_eq!(clean_rating(&"excellent".into(), &words), Some(5.0));
        assert_eq!(clean_rating(&list(&["Three"]), &words), Some(3.5));
    }

    #[test]
    fn test_availability_defaults() {
        let map = AvailabilityMap::default();
        assert_eq!(
            standardize_availability("In stock ", &map).as_deref(),
            Some("in_stock")
        );
        assert_eq!(
            standardize_availability("OUT OF STOCK", &map).as_deref(),
            Some("out_of_stock")
        );
        assert_eq!(
            standardize_availability("Pre-order now", &map).as_deref(),
            Some("preorder")
        );
        assert_eq!(
            standardize_availability("Ask in store", &map).as_deref(),
            Some("unknown")
        );
        assert_eq!(standardize_availability("   ", &map), None);
    }

    #[test]
    fn test_availability_overrides_checked_first() {
        let mut overrides = IndexMap::new();
        overrides.insert("In stock soon".to_string(), "preorder".to_string());
        let map = AvailabilityMap::new(&overrides);

        assert_eq!(
            standardize_availability("in stock soon!", &map).as_deref(),
            Some("preorder")
        );
        assert_eq!(
            standardize_availability("in stock", &map).as_deref(),
            Some("in_stock")
        );
    }
}
