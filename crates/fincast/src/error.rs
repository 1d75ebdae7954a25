//! Error types for the forecasting client.
//!
//! The taxonomy follows the lifecycle of a submission:
//!
//! - [`ValidationError`] is raised locally before any request is built.
//! - [`FincastError::Network`] means the request never completed.
//! - [`FincastError::Service`] means the service answered with a failure (or
//!   with a body outside its contract).
//! - [`RowParseError`] describes one malformed CSV row; ingestion keeps going.
//!
//! None of these are retried and none of them tear down the session. Errors
//! serialize as `{code, message}` so a front end can render them directly.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Local configuration problems that block a submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No date column selected")]
    MissingDateColumn,

    #[error("No target variable selected")]
    MissingTarget,

    #[error("At least one predictor variable must be selected")]
    NoPredictors,

    #[error("Dataset has no rows")]
    EmptyDataset,

    /// A selection refers to a column that is no longer in the dataset.
    #[error("Column '{column}' selected as {field} is not in the current dataset")]
    UnknownColumn { field: &'static str, column: String },
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingDateColumn => "VALIDATION_MISSING_DATE_COLUMN",
            Self::MissingTarget => "VALIDATION_MISSING_TARGET",
            Self::NoPredictors => "VALIDATION_NO_PREDICTORS",
            Self::EmptyDataset => "VALIDATION_EMPTY_DATASET",
            Self::UnknownColumn { .. } => "VALIDATION_UNKNOWN_COLUMN",
        }
    }
}

/// A CSV row that could not be ingested.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("line {line}: {message}")]
pub struct RowParseError {
    /// 1-based line number in the source text.
    pub line: u64,
    pub message: String,
}

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum FincastError {
    /// Configuration is incomplete or stale.
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// The request could not be completed (connect failure, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The service rejected the request or answered outside its contract.
    #[error("Service error: {message}")]
    Service {
        status: Option<u16>,
        message: String,
    },

    /// Malformed CSV row.
    #[error("Parse error at {0}")]
    Parse(RowParseError),

    /// A setter was given a column outside the current dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A selected engineered feature is not on offer.
    #[error("Engineered feature '{0}' is not available")]
    UnknownFeature(String),

    /// Invalid client configuration.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FincastError>,
    },
}

impl FincastError {
    /// Build a service error from an HTTP status and message.
    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FincastError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(inner) => inner.error_code(),
            Self::Network(_) => "NETWORK_ERROR",
            Self::Service { .. } => "SERVICE_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::UnknownFeature(_) => "UNKNOWN_FEATURE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::WithContext { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// Whether the user can fix this by editing the configuration.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::ColumnNotFound(_)
            | Self::UnknownFeature(_)
            | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FincastError {
    fn from(err: reqwest::Error) -> Self {
        FincastError::Network(err.to_string())
    }
}

impl From<crate::config::ConfigValidationError> for FincastError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        FincastError::InvalidConfig(err.to_string())
    }
}

impl Serialize for FincastError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("FincastError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, FincastError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FincastError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FincastError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_codes() {
        let cases = [
            (ValidationError::MissingDateColumn, "VALIDATION_MISSING_DATE_COLUMN"),
            (ValidationError::MissingTarget, "VALIDATION_MISSING_TARGET"),
            (ValidationError::NoPredictors, "VALIDATION_NO_PREDICTORS"),
            (ValidationError::EmptyDataset, "VALIDATION_EMPTY_DATASET"),
        ];
        for (error, code) in cases {
            assert_eq!(FincastError::from(error).error_code(), code);
        }
    }

    #[test]
    fn test_is_recoverable() {
        assert!(FincastError::from(ValidationError::NoPredictors).is_recoverable());
        assert!(FincastError::ColumnNotFound("x".to_string()).is_recoverable());
        assert!(!FincastError::Network("refused".to_string()).is_recoverable());
        assert!(!FincastError::service(Some(500), "boom").is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = FincastError::service(Some(400), "Target column missing");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("SERVICE_ERROR"));
        assert!(json.contains("Target column missing"));
    }

    #[test]
    fn test_with_context_preserves_code() {
        let error = FincastError::from(ValidationError::MissingTarget).with_context("Submitting");
        assert!(error.to_string().contains("Submitting"));
        assert_eq!(error.error_code(), "VALIDATION_MISSING_TARGET");
        assert!(error.is_validation());
    }

    #[test]
    fn test_row_parse_error_display() {
        let error = RowParseError {
            line: 4,
            message: "expected 3 fields, found 2".to_string(),
        };
        assert_eq!(error.to_string(), "line 4: expected 3 fields, found 2");
    }
}
