//! Dataset ingestion and storage.
//!
//! - [`DatasetStore`] owns the working dataset and its column vocabulary.
//! - [`ingest`](self::ingest) tokenizes uploaded CSV text into a [`Dataset`](crate::types::Dataset).
//! - [`table`] renders a dataset through polars for previews and export.

pub mod ingest;
mod store;
pub mod table;

pub use ingest::{IngestReport, parse_csv_path, parse_csv_reader, parse_csv_str};
pub use store::DatasetStore;
