//! Holder of the working dataset.

use crate::types::{Dataset, PredictionResponse};
use std::sync::Arc;
use tracing::debug;

/// The currently loaded dataset and the result computed from it.
///
/// The dataset is replaced wholesale, never edited in place. `columns` is
/// always the key list of the first row of the current dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    dataset: Dataset,
    columns: Vec<String>,
    result: Option<Arc<PredictionResponse>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the working dataset with freshly uploaded rows.
    ///
    /// Any stored prediction result is dropped: it described the old data.
    pub fn ingest(&mut self, rows: Dataset) {
        self.columns = rows.columns();
        self.dataset = rows;
        self.result = None;
        debug!(
            "Ingested {} rows with {} columns",
            self.dataset.len(),
            self.columns.len()
        );
    }

    /// Make the service's predictions the working dataset and keep the
    /// response as the active result.
    pub fn adopt_predictions(&mut self, response: PredictionResponse) -> Arc<PredictionResponse> {
        self.dataset = response.predictions.clone();
        self.columns = self.dataset.columns();
        let response = Arc::new(response);
        self.result = Some(Arc::clone(&response));
        debug!(
            "Adopted {} prediction rows for target '{}'",
            self.dataset.len(),
            response.target
        );
        response
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn result(&self) -> Option<&Arc<PredictionResponse>> {
        self.result.as_ref()
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }
}
