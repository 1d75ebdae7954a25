//! Client-side CSV ingestion.
//!
//! The first record is always the header and supplies the field names. Blank
//! lines are skipped. Every value is kept as text; no type coercion happens on
//! the client. A row whose field count disagrees with the header is reported
//! as a [`RowParseError`] and skipped, and ingestion carries on with the
//! remaining rows.

use crate::error::{Result, ResultExt, RowParseError};
use crate::types::{CellValue, Dataset, Row};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of ingesting one CSV document.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Field names from the header record.
    pub header: Vec<String>,
    /// Rows that parsed cleanly.
    pub dataset: Dataset,
    /// One entry per rejected row, in file order.
    pub errors: Vec<RowParseError>,
}

impl IngestReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse CSV text held in memory.
pub fn parse_csv_str(text: &str) -> Result<IngestReport> {
    parse_csv_reader(text.as_bytes())
}

/// Parse a CSV file from disk.
pub fn parse_csv_path(path: impl AsRef<Path>) -> Result<IngestReport> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .context(format!("Failed to open {}", path.display()))?;
    let report = parse_csv_reader(std::io::BufReader::new(file))?;
    info!(
        "Loaded {}: {} rows, {} rejected",
        path.display(),
        report.dataset.len(),
        report.errors.len()
    );
    Ok(report)
}

/// Parse CSV from any reader.
///
/// Only I/O failures and an unreadable header abort ingestion; everything
/// else is reported per row.
pub fn parse_csv_reader<R: Read>(source: R) -> Result<IngestReport> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if header.is_empty() {
        return Ok(IngestReport::default());
    }

    let mut rows: Vec<Row> = Vec::new();
    let mut errors = Vec::new();
    let mut record = csv::StringRecord::new();

    loop {
        let line = reader.position().line();
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let line = record.position().map(|p| p.line()).unwrap_or(line);
                if is_blank(&record) {
                    continue;
                }
                if record.len() != header.len() {
                    let error = RowParseError {
                        line,
                        message: format!(
                            "expected {} fields, found {}",
                            header.len(),
                            record.len()
                        ),
                    };
                    warn!("Skipping malformed CSV row: {}", error);
                    errors.push(error);
                    continue;
                }
                rows.push(
                    header
                        .iter()
                        .zip(record.iter())
                        .map(|(name, value)| (name.clone(), CellValue::text(value)))
                        .collect(),
                );
            }
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let error = RowParseError {
                    line: err.position().map(|p| p.line()).unwrap_or(line),
                    message: err.to_string(),
                };
                warn!("Skipping malformed CSV row: {}", error);
                errors.push(error);
            }
        }
    }

    Ok(IngestReport {
        header,
        dataset: Dataset::new(rows),
        errors,
    })
}

/// A record consisting only of whitespace, e.g. a line holding stray spaces.
fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty()) && record.len() <= 1
}
