//! Versioned multi-format export
//!
//! Each export writes `products_<YYYYmmdd_HHMMSS>.<ext>` per requested
//! format into the output directory. `FileSink` additionally refreshes the
//! latest snapshot after the versioned files are written.

use super::snapshot::write_latest_snapshot;
use super::traits::{OutputResult, ProductSink};
use crate::product::Product;
use chrono::{DateTime, Utc};
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File formats a batch can be exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Comma-separated values with a header row
    Csv,

    /// Tab-separated values
    Tsv,

    /// Excel workbook with one sheet, header row first
    Xlsx,

    /// Pretty-printed array of records
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xlsx" | "excel" | "spreadsheet" => Ok(Self::Xlsx),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown export format '{}' (expected csv, tsv, xlsx or json)",
                other
            )),
        }
    }
}

/// Paths written by one export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Versioned files, in the order their formats were requested
    pub files: Vec<(ExportFormat, PathBuf)>,

    /// The refreshed snapshot, absent if the overwrite failed
    pub latest: Option<PathBuf>,
}

impl ExportReport {
    pub fn path_for(&self, format: ExportFormat) -> Option<&Path> {
        self.files
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, path)| path.as_path())
    }
}

/// Writes one versioned file per format
///
/// Duplicate formats are written once. The output directory is created if
/// needed; failure to create or write it is returned to the caller.
pub fn export_products(
    products: &[Product],
    formats: &[ExportFormat],
    output_dir: &Path,
    exported_at: DateTime<Utc>,
) -> OutputResult<Vec<(ExportFormat, PathBuf)>> {
    fs::create_dir_all(output_dir)?;

    let stem = format!("products_{}", exported_at.format("%Y%m%d_%H%M%S"));
    let mut written: Vec<(ExportFormat, PathBuf)> = Vec::new();

    for &format in formats {
        if written.iter().any(|(f, _)| *f == format) {
            continue;
        }

        let path = output_dir.join(format!("{}.{}", stem, format.extension()));
        match format {
            ExportFormat::Csv => write_delimited(products, &path, b',')?,
            ExportFormat::Tsv => write_delimited(products, &path, b'\t')?,
            ExportFormat::Xlsx => write_xlsx(products, &path)?,
            ExportFormat::Json => write_json(products, &path)?,
        }

        tracing::info!("Exported {}: {}", format.extension().to_uppercase(), path.display());
        written.push((format, path));
    }

    Ok(written)
}

/// Header row plus one row per product; absent values are empty cells
fn write_delimited(products: &[Product], path: &Path, delimiter: u8) -> OutputResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(Product::COLUMNS)?;
    for product in products {
        writer.serialize(product)?;
    }
    writer.flush()?;
    Ok(())
}

/// Header row plus one row per product; numbers stay numeric, absent values stay blank
fn write_xlsx(products: &[Product], path: &Path) -> OutputResult<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in Product::COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (index, product) in products.iter().enumerate() {
        let row = index as u32 + 1;
        let Value::Object(fields) = serde_json::to_value(product)? else {
            continue;
        };

        for (col, name) in Product::COLUMNS.iter().enumerate() {
            let col = col as u16;
            match fields.get(*name) {
                Some(Value::Number(number)) => {
                    if let Some(value) = number.as_f64() {
                        sheet.write_number(row, col, value)?;
                    }
                }
                Some(Value::String(text)) => {
                    sheet.write_string(row, col, text.as_str())?;
                }
                _ => {}
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

pub(crate) fn write_json(products: &[Product], path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, products)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Sink that exports every batch to disk
///
/// # Example
///
/// ```no_run
/// use ecomscrape::output::{ExportFormat, FileSink, ProductSink};
///
/// let mut sink = FileSink::new(vec![ExportFormat::Csv, ExportFormat::Json], "outputs/processed");
/// sink.write_batch(&[]).unwrap();
/// println!("{:?}", sink.last_report());
/// ```
#[derive(Debug, Clone)]
pub struct FileSink {
    formats: Vec<ExportFormat>,
    output_dir: PathBuf,
    last_report: Option<ExportReport>,
}

impl FileSink {
    pub fn new(formats: Vec<ExportFormat>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            formats,
            output_dir: output_dir.into(),
            last_report: None,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Paths written by the most recent batch
    pub fn last_report(&self) -> Option<&ExportReport> {
        self.last_report.as_ref()
    }
}

impl ProductSink for FileSink {
    fn write_batch(&mut self, products: &[Product]) -> OutputResult<()> {
        let files = export_products(products, &self.formats, &self.output_dir, Utc::now())?;

        let latest = match write_latest_snapshot(products, &self.output_dir) {
            Ok(path) => {
                tracing::debug!("Wrote latest JSON snapshot: {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Failed to write latest JSON snapshot: {}", e);
                None
            }
        };

        self.last_report = Some(ExportReport { files, latest });
        Ok(())
    }
}
