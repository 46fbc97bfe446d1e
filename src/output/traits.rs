//! Output sink traits and types
//!
//! This module defines the trait interface product sinks implement and the
//! errors they surface.

use crate::product::Product;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid output path: {0}")]
    Path(PathBuf),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for product sinks
///
/// A sink receives the cleaned batch of one run, exactly once, after
/// cleaning. It is never called for dry runs.
pub trait ProductSink {
    /// Writes one batch of products
    ///
    /// # Arguments
    ///
    /// * `products` - The cleaned products, in page order
    fn write_batch(&mut self, products: &[Product]) -> OutputResult<()>;
}

/// Sink that keeps every batch in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<Product>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All products received, across batches
    pub fn products(&self) -> Vec<&Product> {
        self.batches.iter().flatten().collect()
    }
}

impl ProductSink for MemorySink {
    fn write_batch(&mut self, products: &[Product]) -> OutputResult<()> {
        self.batches.push(products.to_vec());
        Ok(())
    }
}

impl<S: ProductSink + ?Sized> ProductSink for &mut S {
    fn write_batch(&mut self, products: &[Product]) -> OutputResult<()> {
        (**self).write_batch(products)
    }
}
