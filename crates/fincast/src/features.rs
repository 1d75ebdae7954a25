//! Feature selection: the user's model-request configuration.
//!
//! [`FeatureSelector`] holds a [`FeatureConfig`] together with the option lists
//! it may draw from. Column options mirror the current dataset's columns;
//! engineered-feature options only exist after a successful prediction (the
//! service returns them as `available_features`). Before the first
//! submission the engineered-feature list is empty, which is expected.

use crate::error::{FincastError, Result, ValidationError};
use crate::types::{Dataset, FeatureConfig, ModelType};
use tracing::debug;

/// Hints shown next to the engineered-feature picker.
pub const FEATURE_RECOMMENDATIONS: [&str; 3] = [
    "Include lagged variables for recent trends.",
    "Use rolling means to capture moving averages.",
    "Add interaction terms for combined effects of x-variables.",
];

/// Owner of the current [`FeatureConfig`].
///
/// Setters only enforce membership: a single-column field must name a current
/// column and a multi-select field must be a subset of the current columns.
/// Completeness is checked by [`validate`](Self::validate).
#[derive(Debug, Clone, Default)]
pub struct FeatureSelector {
    config: FeatureConfig,
    column_options: Vec<String>,
    feature_options: Vec<String>,
}

impl FeatureSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Columns offered for the date, category, target and predictor fields.
    pub fn column_options(&self) -> &[String] {
        &self.column_options
    }

    /// Engineered features offered by the last successful prediction.
    pub fn feature_options(&self) -> &[String] {
        &self.feature_options
    }

    /// Refresh the column options after the dataset changed.
    ///
    /// Selections are left untouched; any that no longer match a column show
    /// up in [`stale_selections`](Self::stale_selections).
    pub fn sync_columns(&mut self, columns: &[String]) {
        self.column_options = columns.to_vec();
        let stale = self.stale_selections();
        if !stale.is_empty() {
            debug!("Selections referencing missing columns: {:?}", stale);
        }
    }

    /// Replace the engineered-feature options, dropping selected features
    /// that are no longer offered.
    pub fn set_feature_options(&mut self, features: Vec<String>) {
        self.feature_options = dedup(features);
        let options = &self.feature_options;
        self.config
            .selected_features
            .retain(|feature| options.contains(feature));
    }

    pub fn clear_feature_options(&mut self) {
        self.feature_options.clear();
        self.config.selected_features.clear();
    }

    pub fn set_date_column(&mut self, column: Option<String>) -> Result<()> {
        if let Some(ref name) = column {
            self.require_column(name)?;
        }
        self.config.date_column = column;
        Ok(())
    }

    pub fn set_y_variable(&mut self, column: Option<String>) -> Result<()> {
        if let Some(ref name) = column {
            self.require_column(name)?;
        }
        self.config.y_variable = column;
        Ok(())
    }

    pub fn set_category_columns<I, S>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = self.checked_columns(columns)?;
        self.config.category_columns = columns;
        Ok(())
    }

    pub fn set_x_variables<I, S>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = self.checked_columns(columns)?;
        self.config.x_variables = columns;
        Ok(())
    }

    pub fn set_selected_features<I, S>(&mut self, features: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let features = dedup(features.into_iter().map(Into::into).collect());
        if let Some(unknown) = features.iter().find(|f| !self.feature_options.contains(f)) {
            return Err(FincastError::UnknownFeature(unknown.clone()));
        }
        self.config.selected_features = features;
        Ok(())
    }

    pub fn set_model_type(&mut self, model_type: ModelType) {
        self.config.model_type = model_type;
    }

    /// Selections that name a column outside the current options, as
    /// `(field, column)` pairs.
    pub fn stale_selections(&self) -> Vec<(&'static str, String)> {
        let known = |name: &String| self.column_options.contains(name);
        let mut stale = Vec::new();

        if let Some(date) = self.config.date_column.as_ref().filter(|c| !known(*c)) {
            stale.push(("date column", date.clone()));
        }
        if let Some(target) = self.config.y_variable.as_ref().filter(|c| !known(*c)) {
            stale.push(("target variable", target.clone()));
        }
        for column in self.config.x_variables.iter().filter(|c| !known(*c)) {
            stale.push(("predictor", column.clone()));
        }
        for column in self.config.category_columns.iter().filter(|c| !known(*c)) {
            stale.push(("category column", column.clone()));
        }
        stale
    }

    /// Check that the configuration is complete and current for `dataset`.
    ///
    /// Purely local; never touches the network.
    pub fn validate(
        &self,
        dataset: &Dataset,
    ) -> std::result::Result<FeatureConfig, ValidationError> {
        if self.config.date_column.is_none() {
            return Err(ValidationError::MissingDateColumn);
        }
        if self.config.y_variable.is_none() {
            return Err(ValidationError::MissingTarget);
        }
        if self.config.x_variables.is_empty() {
            return Err(ValidationError::NoPredictors);
        }
        if dataset.is_empty() {
            return Err(ValidationError::EmptyDataset);
        }
        if let Some((field, column)) = self.stale_selections().into_iter().next() {
            return Err(ValidationError::UnknownColumn { field, column });
        }
        Ok(self.config.clone())
    }

    fn require_column(&self, name: &str) -> Result<()> {
        if self.column_options.iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(FincastError::ColumnNotFound(name.to_string()))
        }
    }

    fn checked_columns<I, S>(&self, columns: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = dedup(columns.into_iter().map(Into::into).collect());
        for column in &columns {
            self.require_column(column)?;
        }
        Ok(columns)
    }
}

/// Drop repeats, keeping the first occurrence.
fn dedup(values: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}
