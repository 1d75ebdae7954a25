//! Panel visibility and the user-visible status line.
//!
//! [`ViewState`] is derived from a [`SessionState`] on demand; it holds no
//! state of its own. Every error kind (validation, network, service, parse)
//! lands in the [`StatusBanner`] so the user sees why nothing progressed.

use crate::error::FincastError;
use crate::session::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Latest user-facing status message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBanner {
    pub level: StatusLevel,
    /// Error code for failures, see [`FincastError::error_code`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

impl StatusBanner {
    fn new(level: StatusLevel, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, None, message)
    }

    pub fn from_error(error: &FincastError) -> Self {
        Self::new(
            StatusLevel::Error,
            Some(error.error_code().to_string()),
            error.to_string(),
        )
    }

    /// A recoverable error: keeps the error's code but is shown as a warning.
    pub fn warning_from_error(error: &FincastError, message: impl Into<String>) -> Self {
        Self::new(
            StatusLevel::Warning,
            Some(error.error_code().to_string()),
            message,
        )
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

/// Which panels should be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Dataset table: shown whenever there are rows.
    pub data_table: bool,
    /// Column pickers: shown once the dataset has columns.
    pub feature_config: bool,
    /// Engineered-feature picker: only after a prediction offered features.
    pub feature_engineering: bool,
    /// Charts: only while a successful result is active.
    pub visualizations: bool,
    /// A request is in flight.
    pub submitting: bool,
    /// Selections naming columns the dataset no longer has, as `field: column`.
    pub stale_selections: Vec<String>,
    pub status: Option<StatusBanner>,
}

impl ViewState {
    pub fn derive(state: &SessionState) -> Self {
        let store = state.store();
        let selector = state.selector();

        Self {
            data_table: !store.dataset().is_empty(),
            feature_config: !store.columns().is_empty(),
            feature_engineering: !selector.feature_options().is_empty(),
            visualizations: state.charts().is_some(),
            submitting: state.in_flight().is_some(),
            stale_selections: selector
                .stale_selections()
                .into_iter()
                .map(|(field, column)| format!("{}: {}", field, column))
                .collect(),
            status: state.status().cloned(),
        }
    }
}
