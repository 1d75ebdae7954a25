//! Tabular rendering of datasets through polars.
//!
//! A [`Dataset`] is row-oriented and loosely typed; for the preview table and
//! for exporting predictions it is converted into a polars [`DataFrame`] of
//! string columns. Columns follow the dataset's column list (first-row keys);
//! cells missing from a row, or empty, become nulls.

use crate::error::{Result, ResultExt};
use crate::types::{CellValue, Dataset};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Message shown in place of a table when there is nothing to display.
pub const EMPTY_TABLE_MESSAGE: &str = "No data to display.";

/// Convert a dataset to a string-typed [`DataFrame`].
pub fn to_dataframe(dataset: &Dataset) -> Result<DataFrame> {
    let columns: Vec<Column> = dataset
        .columns()
        .iter()
        .map(|name| {
            let values: Vec<Option<String>> = dataset
                .iter()
                .map(|row| row.get(name).and_then(CellValue::to_text))
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect();

    DataFrame::new(columns).context("Failed to build table from dataset")
}

/// Render the first `max_rows` rows as a text table.
pub fn preview(dataset: &Dataset, max_rows: usize) -> Result<String> {
    if dataset.is_empty() {
        return Ok(EMPTY_TABLE_MESSAGE.to_string());
    }
    let df = to_dataframe(dataset)?;
    Ok(df.head(Some(max_rows)).to_string())
}

/// Write a dataset to a CSV file with a header row.
pub fn write_csv(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut df = to_dataframe(dataset)?;
    let mut file = File::create(path).context(format!("Failed to create {}", path.display()))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)
        .context("Failed to write CSV")?;

    info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    fn sample() -> Dataset {
        vec![
            [
                ("y", CellValue::Number(1.0)),
                ("predicted_y", CellValue::Number(2.0)),
                ("note", CellValue::text("a")),
            ]
            .into_iter()
            .collect::<Row>(),
            [("y", CellValue::Number(3.0)), ("note", CellValue::Empty)]
                .into_iter()
                .collect::<Row>(),
        ]
        .into()
    }

    #[test]
    fn test_to_dataframe_shape() {
        let df = to_dataframe(&sample()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["y", "predicted_y", "note"]);
    }

    #[test]
    fn test_missing_and_empty_cells_are_null() {
        let df = to_dataframe(&sample()).unwrap();
        assert_eq!(df.column("predicted_y").unwrap().null_count(), 1);
        assert_eq!(df.column("note").unwrap().null_count(), 1);
    }

    #[test]
    fn test_preview_empty_dataset() {
        assert_eq!(preview(&Dataset::default(), 10).unwrap(), EMPTY_TABLE_MESSAGE);
    }

    #[test]
    fn test_preview_contains_headers() {
        let text = preview(&sample(), 5).unwrap();
        assert!(text.contains("predicted_y"));
    }
}
