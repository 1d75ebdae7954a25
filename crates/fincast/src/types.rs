//! Core data types shared across the session pipeline.
//!
//! These types mirror the JSON contract of the remote modeling service:
//! snake_case field names on the request side are fixed by the service and
//! must not be renamed.

use crate::ordered::OrderedMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single cell of a row.
///
/// CSV ingestion only ever produces [`CellValue::Text`]; numbers and empty
/// cells appear in datasets returned by the modeling service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric view of the cell. Text is parsed leniently (surrounding
    /// whitespace ignored).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Empty => None,
        }
    }

    /// Text rendering used by the tabular preview; `None` for empty cells.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Empty => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One row: column name to cell, in column order.
pub type Row = OrderedMap<CellValue>;

/// An ordered sequence of rows.
///
/// The column vocabulary is taken from the first row only; rows with
/// heterogeneous keys are accepted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names: the keys of the first row, in insertion order.
    pub fn columns(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl From<Vec<Row>> for Dataset {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Model family requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    Linear,
    RandomForest,
    Xgboost,
    Ensemble,
}

impl ModelType {
    /// Wire name understood by the modeling service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::RandomForest => "random_forest",
            Self::Xgboost => "xgboost",
            Self::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "random_forest" => Ok(Self::RandomForest),
            "xgboost" => Ok(Self::Xgboost),
            "ensemble" => Ok(Self::Ensemble),
            other => Err(format!("Unknown model type: {}", other)),
        }
    }
}

/// The user's current model-request configuration.
///
/// `category_columns` and `x_variables` are sets with insertion order: the
/// selector never stores a duplicate, and the order the user picked them in
/// is the order sent to the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub date_column: Option<String>,
    pub category_columns: Vec<String>,
    pub y_variable: Option<String>,
    pub x_variables: Vec<String>,
    pub selected_features: Vec<String>,
    pub model_type: ModelType,
}

/// Request body for `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub data: Dataset,
    pub date_column: String,
    pub category_columns: Vec<String>,
    pub y_variable: String,
    pub x_variables: Vec<String>,
    pub selected_features: Vec<String>,
    pub model_type: ModelType,
}

/// Error metrics reported for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub mae: f64,
    pub rmse: f64,
}

/// Success body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Original rows plus a `predicted_<target>` field per row.
    pub predictions: Dataset,
    #[serde(default)]
    pub metrics: OrderedMap<ErrorMetrics>,
    #[serde(rename = "featureImportance", default)]
    pub feature_importance: OrderedMap<OrderedMap<f64>>,
    pub target: String,
    #[serde(default)]
    pub available_features: Vec<String>,
}

impl PredictionResponse {
    /// Name of the per-row prediction field for this response's target.
    pub fn predicted_field(&self) -> String {
        predicted_field_name(&self.target)
    }
}

/// `"predicted_" + target`.
pub fn predicted_field_name(target: &str) -> String {
    format!("predicted_{}", target)
}
