//! Run summary display
//!
//! This module formats the outcome of a scrape run and the files it wrote
//! for the terminal.

use super::export::ExportReport;
use crate::crawler::RunReport;
use std::fmt::Write;

/// Formats a run summary as plain text
///
/// # Arguments
///
/// * `report` - The run report returned by the coordinator
/// * `export` - Paths written by the sink, if it exported anything
pub fn format_run_summary(report: &RunReport, export: Option<&ExportReport>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Scrape Summary: {} ===\n", report.site_name);

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Pages planned: {}", report.pages_planned);
    let _ = writeln!(out, "  Pages with HTML: {}", report.pages_with_html);
    let _ = writeln!(out, "  Raw records: {}", report.raw_records);
    if report.dry_run {
        let _ = writeln!(out, "  Products: (dry run, nothing exported)");
    } else {
        let _ = writeln!(out, "  Products: {}", report.products);
    }
    let _ = writeln!(out, "  Collection ended: {}", report.collection);
    let _ = writeln!(out);

    let total = report.fetch.successes + report.fetch.failures;
    let success_rate = if total > 0 {
        (report.fetch.successes as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(
        out,
        "Requests: {} success, {} failure ({:.1}% success)",
        report.fetch.successes, report.fetch.failures, success_rate
    );

    if let Some(export) = export {
        if !export.files.is_empty() {
            let _ = writeln!(out, "\nExported files:");
            for (format, path) in &export.files {
                let _ = writeln!(out, "  {}: {}", format, path.display());
            }
        }
        if let Some(latest) = &export.latest {
            let _ = writeln!(out, "Latest snapshot: {}", latest.display());
        }
    }

    out
}

/// Prints a run summary to stdout
pub fn print_run_summary(report: &RunReport, export: Option<&ExportReport>) {
    print!("{}", format_run_summary(report, export));
}
