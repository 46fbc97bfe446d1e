//! Output module for exporting scraped products
//!
//! This module handles:
//! - The sink interface the pipeline hands cleaned batches to
//! - Versioned CSV/TSV/JSON exports
//! - The latest-snapshot file and the query over it
//! - Printing run summaries

mod export;
mod snapshot;
pub mod stats;
mod traits;

pub use export::{export_products, ExportFormat, ExportReport, FileSink};
pub use snapshot::{
    filter_products, load_snapshot, snapshot_generated_at, write_latest_snapshot, ProductQuery,
    LATEST_SNAPSHOT_FILE,
};
pub use stats::{format_run_summary, print_run_summary};
pub use traits::{MemorySink, OutputError, OutputResult, ProductSink};
