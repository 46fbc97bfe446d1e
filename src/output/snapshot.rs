//! Latest-snapshot file and the query over it
//!
//! The snapshot is a JSON array of products overwritten after every export.
//! Readers treat a missing snapshot as an empty catalogue.

use super::export::write_json;
use super::traits::OutputResult;
use crate::product::Product;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the snapshot inside the output directory
pub const LATEST_SNAPSHOT_FILE: &str = "latest_products.json";

/// Overwrites the snapshot in `output_dir`, returning its path
pub fn write_latest_snapshot(products: &[Product], output_dir: &Path) -> OutputResult<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(LATEST_SNAPSHOT_FILE);
    write_json(products, &path)?;
    Ok(path)
}

/// Reads a snapshot; a missing file yields an empty list
pub fn load_snapshot(path: &Path) -> OutputResult<Vec<Product>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(serde_json::from_str(&content)?)
}

/// Modification time of the snapshot as RFC 3339, if the file exists
pub fn snapshot_generated_at(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).to_rfc3339())
}

/// Price-range and category filter over snapshot products
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductQuery {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,

    /// Exact category, compared case-insensitively
    pub category: Option<String>,
}

impl ProductQuery {
    /// Returns true if the product passes every given bound
    ///
    /// Prices fall back from current to original. Products without either
    /// are excluded as soon as a price bound is set.
    pub fn matches(&self, product: &Product) -> bool {
        let price = product.effective_price();

        if let Some(min) = self.min_price {
            if !price.is_some_and(|p| p >= min) {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if !price.is_some_and(|p| p <= max) {
                return false;
            }
        }

        match self.category.as_deref().filter(|c| !c.is_empty()) {
            Some(category) => product.category.to_lowercase() == category.to_lowercase(),
            None => true,
        }
    }
}

/// Products matching the query, in snapshot order
pub fn filter_products(products: &[Product], query: &ProductQuery) -> Vec<Product> {
    products
        .iter()
        .filter(|product| query.matches(product))
        .cloned()
        .collect()
}
