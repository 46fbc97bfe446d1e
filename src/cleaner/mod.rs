//! Cleaner: raw field maps to typed products
//!
//! Cleaning is pure and order-preserving. The capture clock is read once
//! per batch so every product in a batch shares one `scraped_at`.

mod fields;
mod identity;

pub use fields::{
    clean_price, clean_rating, clean_review_count, normalize_text, standardize_availability,
    AvailabilityMap, RatingWords, DEFAULT_AVAILABILITY, DEFAULT_RATING_WORDS,
    UNKNOWN_AVAILABILITY,
};
pub use identity::{stable_product_id, UNKNOWN_IDENTITY};

use crate::config::CleaningConfig;
use crate::product::{Product, RawRecord};
use chrono::{DateTime, SecondsFormat, Utc};

/// Category used when a record names none
pub const UNKNOWN_CATEGORY: &str = "unknown";

const CATEGORY_FIELDS: [&str; 4] = ["category", "genre", "type", "category_name"];

/// Turns raw records into products using a site's lookup tables
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    rating_words: RatingWords,
    availability: AvailabilityMap,
}

impl Cleaner {
    /// Builds the lookup tables once, site overrides layered over the defaults
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            rating_words: RatingWords::new(&config.rating_words),
            availability: AvailabilityMap::new(&config.availability_map),
        }
    }

    /// Cleans a batch, stamping every product with the current time
    pub fn clean(&self, records: &[RawRecord], currency: Option<&str>) -> Vec<Product> {
        self.clean_at(records, currency, Utc::now())
    }

    /// Cleans a batch with an explicit capture time
    ///
    /// Same records and same `captured_at` always give identical products.
    pub fn clean_at(
        &self,
        records: &[RawRecord],
        currency: Option<&str>,
        captured_at: DateTime<Utc>,
    ) -> Vec<Product> {
        let scraped_at = captured_at.to_rfc3339_opts(SecondsFormat::Secs, true);

        let products: Vec<Product> = records
            .iter()
            .map(|record| self.clean_record(record, currency, &scraped_at))
            .collect();

        tracing::debug!("Cleaned {} products", products.len());
        products
    }

    fn clean_record(&self, record: &RawRecord, currency: Option<&str>, scraped_at: &str) -> Product {
        let title = record.first_text(&["title", "name"]);
        let category = record.first_text(&CATEGORY_FIELDS);
        let product_url = record.first_text(&["product_url", "url"]);
        let source_url = record.source_url();

        let id = stable_product_id(
            product_url.as_deref(),
            source_url.as_deref(),
            title.as_deref(),
            category.as_deref(),
        );

        Product {
            id,
            name: record.text("name").or_else(|| title.clone()),
            title,
            price_current: record.text("price_current").and_then(|p| clean_price(&p)),
            price_original: record.text("price_original").and_then(|p| clean_price(&p)),
            rating: record
                .get("rating")
                .and_then(|r| clean_rating(r, &self.rating_words)),
            availability: record
                .get("availability")
                .and_then(|a| standardize_availability(&a.as_text(), &self.availability)),
            image_url: record.text("image_url"),
            url: record.text("url"),
            product_url,
            source_url,
            category: category.unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
            currency: record
                .text("currency")
                .or_else(|| currency.map(str::to_string)),
            review_count: record
                .text("review_count")
                .and_then(|c| clean_review_count(&c)),
            scraped_at: scraped_at.to_string(),
            description: record.text("description"),
        }
    }
}

/// Cleans a batch with a one-off cleaner built from `cleaning`
pub fn clean_products(
    records: &[RawRecord],
    currency: Option<&str>,
    cleaning: &CleaningConfig,
) -> Vec<Product> {
    Cleaner::new(cleaning).clean(records, currency)
}
