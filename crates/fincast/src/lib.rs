//! Forecasting Session Client
//!
//! Client-side orchestration for a remote forecasting service, built with
//! Rust, tokio and Polars.
//!
//! # Overview
//!
//! The library covers everything between an uploaded spreadsheet and the
//! charts of a fitted model:
//!
//! - **Ingestion**: client-side CSV parsing with per-row error reporting
//! - **Configuration**: date, category, target and predictor columns plus
//!   engineered features and the model type, checked against the dataset
//! - **Request Building**: a local validation gate; invalid configurations
//!   never reach the network
//! - **Prediction Lifecycle**: one async request per submission, with
//!   request ids so only the most recently issued submission is adopted
//! - **Reshaping**: forecast, error-metric and feature-importance series,
//!   computed once per response
//! - **View State**: panel visibility and a user-visible status banner
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fincast::{HttpModelService, ModelType, ServiceConfig, Session};
//!
//! let config = ServiceConfig::builder()
//!     .base_url("http://127.0.0.1:5000")
//!     .timeout_secs(60)
//!     .build()?;
//!
//! let session = Session::builder(HttpModelService::new(config)?)
//!     .on_phase(|update| println!("[{}] {}", update.phase.display_name(), update.message))
//!     .build();
//!
//! let report = session.ingest_csv(&std::fs::read_to_string("sales.csv")?)?;
//! for error in &report.errors {
//!     eprintln!("skipped {}", error);
//! }
//!
//! session.update_config(|selector| {
//!     selector.set_date_column(Some("date".into()))?;
//!     selector.set_y_variable(Some("amount".into()))?;
//!     selector.set_x_variables(["price", "promo"])?;
//!     selector.set_model_type(ModelType::RandomForest);
//!     Ok(())
//! })?;
//!
//! session.submit().await?;
//!
//! if let Some(charts) = session.charts() {
//!     for metric in &charts.error_metrics {
//!         println!("{}: MAE {:.3}, RMSE {:.3}", metric.model, metric.mae, metric.rmse);
//!     }
//! }
//! ```
//!
//! # Model Services
//!
//! The session reaches the modeling service through the
//! [`client::ModelService`] trait. [`HttpModelService`] is the reqwest-backed
//! implementation; tests substitute scripted services.
//!
//! # Concurrency
//!
//! [`Session`] is a cheaply clonable, `Send + Sync` handle. A second
//! submission while one is in flight cancels the first; whichever response
//! arrives, only the most recently issued request is applied.

pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod ordered;
pub mod request;
pub mod reshape;
pub mod session;
pub mod types;
pub mod view;

// Re-exports for convenient access
pub use client::{HttpModelService, ModelService};
pub use config::{ConfigValidationError, ServiceConfig, ServiceConfigBuilder};
pub use dataset::{DatasetStore, IngestReport, parse_csv_path, parse_csv_str};
pub use error::{FincastError, Result, ResultExt, RowParseError, ValidationError};
pub use features::{FEATURE_RECOMMENDATIONS, FeatureSelector};
pub use ordered::OrderedMap;
pub use request::RequestBuilder;
pub use reshape::{
    ChartData, ErrorMetricPoint, FeatureImportanceSeries, ForecastPoint, ResultReshaper,
};
pub use session::{
    CancellationToken, ClosurePhaseReporter, PhaseReporter, PhaseUpdate, RequestId, Session,
    SessionBuilder, SessionState, SubmissionPhase, SubmitOutcome,
};
pub use types::{
    CellValue, Dataset, ErrorMetrics, FeatureConfig, ModelType, PredictionRequest,
    PredictionResponse, Row,
};
pub use view::{StatusBanner, StatusLevel, ViewState};
