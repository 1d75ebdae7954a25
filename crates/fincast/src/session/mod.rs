//! The session controller.
//!
//! A [`Session`] owns the single active configuration for the single active
//! dataset: the [`DatasetStore`], the [`FeatureSelector`], the active result
//! with its cached [`ChartData`], the submission phase and the status banner.
//! Everything is mutated through the transitions defined here.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── Session<S> (Arc) ─────────────────────────────┐
//! │  service: S (ModelService)          reporter: Option<Arc<dyn PhaseReporter>>│
//! │  state: RwLock<SessionState>                                               │
//! │  ┌──────────────────────────────────────────────────────────────────────┐  │
//! │  │ store: DatasetStore           selector: FeatureSelector              │  │
//! │  │ charts: Option<Arc<ChartData>> phase: SubmissionPhase                │  │
//! │  │ tracker: RequestTracker        status: Option<StatusBanner>          │  │
//! │  └──────────────────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! The lock is never held across an `.await`; the only suspension point is
//! the call to [`ModelService::predict`]. Each submission that passes
//! validation is issued a fresh [`RequestId`]. Issuing a new one cancels the
//! previous request, and a response whose id is not the latest issued is
//! discarded, so the session always reflects the most recently issued
//! submission regardless of the order responses arrive in.

mod cancellation;
mod phase;
mod tracker;

pub use cancellation::CancellationToken;
pub use phase::{ClosurePhaseReporter, PhaseReporter, PhaseUpdate, SubmissionPhase};
pub use tracker::{RequestId, RequestTracker, Ticket};

use crate::client::ModelService;
use crate::dataset::{DatasetStore, IngestReport, parse_csv_str};
use crate::error::{FincastError, Result, ValidationError};
use crate::features::FeatureSelector;
use crate::request::RequestBuilder;
use crate::reshape::{ChartData, ResultReshaper};
use crate::types::{Dataset, FeatureConfig, PredictionRequest, PredictionResponse};
use crate::view::{StatusBanner, ViewState};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a submission that reached the service ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The response was adopted into the session.
    Applied { request_id: RequestId, rows: usize },
    /// A newer submission (or a new upload) made this one stale; its
    /// response, if any, was discarded.
    Superseded { request_id: RequestId },
}

impl SubmitOutcome {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Applied { request_id, .. } | Self::Superseded { request_id } => *request_id,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// State guarded by the session lock.
#[derive(Debug, Default)]
pub struct SessionState {
    store: DatasetStore,
    selector: FeatureSelector,
    charts: Option<Arc<ChartData>>,
    phase: SubmissionPhase,
    tracker: RequestTracker,
    status: Option<StatusBanner>,
    last_applied: Option<RequestId>,
}

impl SessionState {
    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn selector(&self) -> &FeatureSelector {
        &self.selector
    }

    pub fn charts(&self) -> Option<&Arc<ChartData>> {
        self.charts.as_ref()
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub fn status(&self) -> Option<&StatusBanner> {
        self.status.as_ref()
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.tracker.in_flight()
    }

    /// Id of the submission whose response is currently adopted.
    pub fn last_applied(&self) -> Option<RequestId> {
        self.last_applied
    }

    /// A request still in flight becomes stale and the phase returns to `Idle`.
    fn ingest(&mut self, rows: Dataset, updates: &mut Vec<PhaseUpdate>) {
        if let Some(pending) = self.tracker.in_flight() {
            info!("Request {} superseded by a new upload", pending);
            self.transition(
                Some(pending),
                SubmissionPhase::Idle,
                "Request superseded by a new upload",
                updates,
            );
        }
        self.tracker.invalidate();
        self.store.ingest(rows);
        self.charts = None;
        self.last_applied = None;
        self.selector.sync_columns(self.store.columns());
        self.selector.clear_feature_options();
    }

    /// Validating → Building → Sending. On a validation failure nothing else
    /// changes and the phase goes back to `Idle`, or to `Sending` when an
    /// earlier request is still in flight.
    fn begin(&mut self, updates: &mut Vec<PhaseUpdate>) -> Result<(Ticket, PredictionRequest)> {
        self.transition(None, SubmissionPhase::Validating, "Validating configuration", updates);
        let config = match self.selector.validate(self.store.dataset()) {
            Ok(config) => config,
            Err(err) => return Err(self.reject(err, updates)),
        };

        self.transition(None, SubmissionPhase::Building, "Building prediction request", updates);
        let request = match RequestBuilder::from_config(self.store.dataset().clone(), config) {
            Ok(request) => request,
            Err(err) => return Err(self.reject(err, updates)),
        };

        let ticket = self.tracker.issue();
        self.transition(
            Some(ticket.id),
            SubmissionPhase::Sending,
            format!("Sending {} rows to the modeling service", request.data.len()),
            updates,
        );
        Ok((ticket, request))
    }

    fn reject(&mut self, error: ValidationError, updates: &mut Vec<PhaseUpdate>) -> FincastError {
        let error = FincastError::from(error);
        warn!("Submission rejected: {}", error);
        self.status = Some(StatusBanner::from_error(&error));
        let pending = self.tracker.in_flight();
        let phase = match pending {
            Some(_) => SubmissionPhase::Sending,
            None => SubmissionPhase::Idle,
        };
        self.transition(pending, phase, error.to_string(), updates);
        error
    }

    /// Apply the result of a request that ran to completion.
    fn finish(
        &mut self,
        ticket: &Ticket,
        result: Result<PredictionResponse>,
        updates: &mut Vec<PhaseUpdate>,
    ) -> Result<SubmitOutcome> {
        let request_id = ticket.id;
        if !self.tracker.is_current(request_id) {
            debug!("Discarding response for superseded request {}", request_id);
            return Ok(SubmitOutcome::Superseded { request_id });
        }
        self.tracker.complete(request_id);

        let reshaped = result.and_then(|response| {
            let charts = ResultReshaper::reshape(&response)?;
            Ok((response, charts))
        });

        match reshaped {
            Ok((response, charts)) => {
                let rows = response.predictions.len();
                let active = self.store.adopt_predictions(response);
                self.selector.sync_columns(self.store.columns());
                self.selector
                    .set_feature_options(active.available_features.clone());
                self.charts = Some(Arc::new(charts));
                self.last_applied = Some(request_id);

                let message = format!("Received {} predictions for '{}'", rows, active.target);
                info!("Request {}: {}", request_id, message);
                self.status = Some(StatusBanner::info(message.clone()));
                self.transition(Some(request_id), SubmissionPhase::Succeeded, message, updates);
                self.transition(Some(request_id), SubmissionPhase::Idle, "Ready", updates);
                Ok(SubmitOutcome::Applied { request_id, rows })
            }
            Err(err) => {
                warn!("Request {} failed: {}", request_id, err);
                self.status = Some(StatusBanner::from_error(&err));
                let message = err.to_string();
                self.transition(Some(request_id), SubmissionPhase::Failed, message, updates);
                self.transition(Some(request_id), SubmissionPhase::Idle, "Ready", updates);
                Err(err)
            }
        }
    }

    fn transition(
        &mut self,
        request_id: Option<RequestId>,
        phase: SubmissionPhase,
        message: impl Into<String>,
        updates: &mut Vec<PhaseUpdate>,
    ) {
        self.phase = phase;
        let update = PhaseUpdate::new(request_id, phase, message);
        debug!("Phase {}: {}", phase.display_name(), update.message);
        updates.push(update);
    }
}

struct SessionInner<S> {
    service: S,
    state: RwLock<SessionState>,
    reporter: Option<Arc<dyn PhaseReporter>>,
}

/// Handle to the current session. Clones share the same state.
///
/// # Example
///
/// ```rust,ignore
/// use fincast::{HttpModelService, ServiceConfig, Session};
///
/// let session = Session::new(HttpModelService::new(ServiceConfig::default())?);
/// session.ingest_csv(&std::fs::read_to_string("sales.csv")?)?;
/// session.update_config(|selector| {
///     selector.set_date_column(Some("date".into()))?;
///     selector.set_y_variable(Some("amount".into()))?;
///     selector.set_x_variables(["price"])
/// })?;
/// let outcome = session.submit().await?;
/// let charts = session.charts();
/// ```
pub struct Session<S> {
    inner: Arc<SessionInner<S>>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

static_assertions::assert_impl_all!(Session<crate::client::HttpModelService>: Send, Sync);

/// Builder for [`Session`].
pub struct SessionBuilder<S> {
    service: S,
    reporter: Option<Arc<dyn PhaseReporter>>,
}

impl<S: ModelService> SessionBuilder<S> {
    pub fn reporter(mut self, reporter: Arc<dyn PhaseReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Receive phase transitions through a closure.
    pub fn on_phase<F>(self, callback: F) -> Self
    where
        F: Fn(PhaseUpdate) + Send + Sync + 'static,
    {
        self.reporter(Arc::new(ClosurePhaseReporter::new(callback)))
    }

    pub fn build(self) -> Session<S> {
        Session {
            inner: Arc::new(SessionInner {
                service: self.service,
                state: RwLock::new(SessionState::default()),
                reporter: self.reporter,
            }),
        }
    }
}

impl<S: ModelService> Session<S> {
    pub fn new(service: S) -> Self {
        Self::builder(service).build()
    }

    pub fn builder(service: S) -> SessionBuilder<S> {
        SessionBuilder {
            service,
            reporter: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.inner.service
    }

    /// Run `f` against a consistent snapshot of the state.
    pub fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&*self.inner.state.read())
    }

    /// Replace the dataset with uploaded rows.
    ///
    /// Clears the active result and the engineered-feature options and makes
    /// any in-flight request stale.
    pub fn ingest(&self, rows: Dataset) {
        let count = rows.len();
        let mut updates = Vec::new();
        {
            let mut state = self.inner.state.write();
            state.ingest(rows, &mut updates);
            state.status = Some(StatusBanner::info(format!("Loaded {} rows", count)));
        }
        info!("Session dataset replaced: {} rows", count);
        self.emit(updates);
    }

    /// Parse CSV text and ingest the rows that parsed.
    ///
    /// Malformed rows are skipped and summarized in the status banner; the
    /// returned report lists each of them.
    pub fn ingest_csv(&self, text: &str) -> Result<IngestReport> {
        let report = match parse_csv_str(text) {
            Ok(report) => report,
            Err(err) => {
                self.inner.state.write().status = Some(StatusBanner::from_error(&err));
                return Err(err);
            }
        };

        let status = match report.errors.first() {
            Some(first) => {
                let error = FincastError::Parse(first.clone());
                StatusBanner::warning_from_error(
                    &error,
                    format!(
                        "Loaded {} rows; skipped {} malformed rows (first: {})",
                        report.dataset.len(),
                        report.errors.len(),
                        first
                    ),
                )
            }
            None => StatusBanner::info(format!("Loaded {} rows", report.dataset.len())),
        };

        let mut updates = Vec::new();
        {
            let mut state = self.inner.state.write();
            state.ingest(report.dataset.clone(), &mut updates);
            state.status = Some(status);
        }
        self.emit(updates);
        Ok(report)
    }

    /// Edit the feature configuration.
    ///
    /// The closure works on a draft that is committed only when it returns
    /// `Ok`. A rejected edit is reported in the status banner and leaves the
    /// configuration as it was, including any setters that ran before the
    /// failing one.
    pub fn update_config<T>(&self, f: impl FnOnce(&mut FeatureSelector) -> Result<T>) -> Result<T> {
        let mut state = self.inner.state.write();
        let mut draft = state.selector.clone();
        match f(&mut draft) {
            Ok(value) => {
                state.selector = draft;
                Ok(value)
            }
            Err(err) => {
                state.status = Some(StatusBanner::from_error(&err));
                Err(err)
            }
        }
    }

    /// Validate, build and send the current configuration.
    ///
    /// # Errors
    ///
    /// - [`FincastError::Validation`] before any request is issued.
    /// - [`FincastError::Network`] / [`FincastError::Service`] when the
    ///   request fails; the dataset, configuration and prior result are left
    ///   untouched.
    pub async fn submit(&self) -> Result<SubmitOutcome> {
        let mut updates = Vec::new();
        let begun = {
            let mut state = self.inner.state.write();
            state.begin(&mut updates)
        };
        self.emit(updates);
        let (ticket, request) = begun?;
        info!(
            "Request {} dispatched to the {} model service",
            ticket.id,
            self.inner.service.name()
        );

        let response = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => None,
            result = self.inner.service.predict(&request) => Some(result),
        };

        let mut updates = Vec::new();
        let outcome = {
            let mut state = self.inner.state.write();
            match response {
                Some(result) => state.finish(&ticket, result, &mut updates),
                None => {
                    debug!("Request {} cancelled while in flight", ticket.id);
                    Ok(SubmitOutcome::Superseded {
                        request_id: ticket.id,
                    })
                }
            }
        };
        self.emit(updates);
        outcome
    }

    pub fn view(&self) -> ViewState {
        self.read(ViewState::derive)
    }

    pub fn dataset(&self) -> Dataset {
        self.read(|state| state.store.dataset().clone())
    }

    pub fn columns(&self) -> Vec<String> {
        self.read(|state| state.store.columns().to_vec())
    }

    pub fn config(&self) -> FeatureConfig {
        self.read(|state| state.selector.config().clone())
    }

    pub fn feature_options(&self) -> Vec<String> {
        self.read(|state| state.selector.feature_options().to_vec())
    }

    pub fn result(&self) -> Option<Arc<PredictionResponse>> {
        self.read(|state| state.store.result().cloned())
    }

    pub fn charts(&self) -> Option<Arc<ChartData>> {
        self.read(|state| state.charts.clone())
    }

    pub fn status(&self) -> Option<StatusBanner> {
        self.read(|state| state.status.clone())
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.read(|state| state.phase)
    }

    fn emit(&self, updates: Vec<PhaseUpdate>) {
        if let Some(reporter) = &self.inner.reporter {
            for update in updates {
                reporter.report(update);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordered::OrderedMap;
    use crate::types::{CellValue, ErrorMetrics, Row, predicted_field_name};
    use crate::view::StatusLevel;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CSV: &str = "date,amount,category,price\n\
                       2024-01-01,10,food,2.5\n\
                       2024-01-02,12,rent,3.0\n\
                       2024-01-03,9,food,2.0\n";

    /// Answers every request by echoing the rows back with a prediction.
    #[derive(Default)]
    struct EchoService {
        calls: AtomicUsize,
        fail_with: Option<String>,
        drop_target: bool,
    }

    impl ModelService for EchoService {
        async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.fail_with {
                return Err(FincastError::service(Some(500), message.clone()));
            }
            let mut response = echo(request);
            if self.drop_target {
                response.predictions = Dataset::new(vec![Row::new()]);
            }
            Ok(response)
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn echo(request: &PredictionRequest) -> PredictionResponse {
        let target = request.y_variable.clone();
        let predictions: Vec<Row> = request
            .data
            .iter()
            .map(|row| {
                let mut row = row.clone();
                let actual = row.get(&target).and_then(CellValue::as_f64).unwrap_or(0.0);
                row.insert(predicted_field_name(&target), CellValue::Number(actual + 1.0));
                row
            })
            .collect();

        let mut metrics = OrderedMap::new();
        metrics.insert(request.model_type.as_str(), ErrorMetrics { mae: 1.0, rmse: 1.5 });
        let mut importance = OrderedMap::new();
        importance.insert(
            request.model_type.as_str(),
            request
                .x_variables
                .iter()
                .map(|x| (x.clone(), 1.0 / request.x_variables.len() as f64))
                .collect::<OrderedMap<f64>>(),
        );

        PredictionResponse {
            predictions: predictions.into(),
            metrics,
            feature_importance: importance,
            target,
            available_features: vec!["lag_1".to_string(), "rolling_mean_3".to_string()],
        }
    }

    fn configure<S: ModelService>(session: &Session<S>) {
        session
            .update_config(|selector| {
                selector.set_date_column(Some("date".into()))?;
                selector.set_y_variable(Some("amount".into()))?;
                selector.set_x_variables(["price"])
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_validation_failure_sends_nothing() {
        let session = Session::new(EchoService::default());
        session.ingest_csv(CSV).unwrap();

        let err = session.submit().await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_MISSING_DATE_COLUMN");
        assert_eq!(session.service().calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.phase(), SubmissionPhase::Idle);
        assert!(session.status().unwrap().is_error());
        assert_eq!(session.read(|s| s.in_flight()), None);
    }

    #[tokio::test]
    async fn test_empty_dataset_sends_nothing() {
        let session = Session::new(EchoService::default());
        session.ingest_csv(CSV).unwrap();
        configure(&session);
        session.ingest(Dataset::default());

        let err = session.submit().await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_EMPTY_DATASET");
        assert_eq!(session.service().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_submit_adopts_predictions() {
        let session = Session::new(EchoService::default());
        session.ingest_csv(CSV).unwrap();
        configure(&session);
        assert!(session.feature_options().is_empty());

        let outcome = session.submit().await.unwrap();
        assert!(outcome.is_applied());
        assert_eq!(session.service().calls.load(Ordering::SeqCst), 1);

        assert_eq!(
            session.columns(),
            vec!["date", "amount", "category", "price", "predicted_amount"]
        );
        assert_eq!(session.feature_options(), vec!["lag_1", "rolling_mean_3"]);
        let charts = session.charts().expect("charts cached");
        assert_eq!(charts.forecast.len(), 3);
        assert_eq!(charts.forecast[0].predicted, Some(CellValue::Number(11.0)));
        assert_eq!(session.read(|s| s.last_applied()), Some(outcome.request_id()));

        let view = session.view();
        assert!(view.visualizations);
        assert!(view.feature_engineering);
        assert!(!view.submitting);
    }

    #[tokio::test]
    async fn test_service_failure_leaves_state_untouched() {
        let session = Session::new(EchoService {
            fail_with: Some("model exploded".to_string()),
            ..Default::default()
        });
        session.ingest_csv(CSV).unwrap();
        configure(&session);
        let dataset_before = session.dataset();
        let config_before = session.config();

        let err = session.submit().await.unwrap_err();
        assert_eq!(err.error_code(), "SERVICE_ERROR");
        assert_eq!(session.dataset(), dataset_before);
        assert_eq!(session.config(), config_before);
        assert!(session.result().is_none());
        assert!(!session.view().visualizations);

        let status = session.status().unwrap();
        assert_eq!(status.code.as_deref(), Some("SERVICE_ERROR"));
        assert!(status.message.contains("model exploded"));
    }

    #[tokio::test]
    async fn test_missing_target_in_response_is_service_error() {
        let session = Session::new(EchoService {
            drop_target: true,
            ..Default::default()
        });
        session.ingest_csv(CSV).unwrap();
        configure(&session);

        let err = session.submit().await.unwrap_err();
        assert_eq!(err.error_code(), "SERVICE_ERROR");
        assert_eq!(session.dataset().len(), 3);
        assert!(session.charts().is_none());
    }

    #[tokio::test]
    async fn test_new_upload_clears_result_and_feature_options() {
        let session = Session::new(EchoService::default());
        session.ingest_csv(CSV).unwrap();
        configure(&session);
        session.submit().await.unwrap();
        session
            .update_config(|selector| selector.set_selected_features(["lag_1"]))
            .unwrap();

        session.ingest_csv(CSV).unwrap();
        assert!(session.result().is_none());
        assert!(session.charts().is_none());
        assert!(session.feature_options().is_empty());
        assert!(session.config().selected_features.is_empty());
        assert_eq!(session.config().x_variables, vec!["price"]);
    }

    #[tokio::test]
    async fn test_stale_config_after_upload_is_rejected() {
        let session = Session::new(EchoService::default());
        session.ingest_csv(CSV).unwrap();
        configure(&session);
        session.ingest_csv("date,amount\n2024-01-01,10\n").unwrap();

        assert_eq!(session.view().stale_selections, vec!["predictor: price"]);
        let err = session.submit().await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_UNKNOWN_COLUMN");
        assert_eq!(session.service().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_phase_sequence_reported() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let session = Session::builder(EchoService::default())
            .on_phase(move |update| sink.lock().push(update.phase))
            .build();
        session.ingest_csv(CSV).unwrap();
        configure(&session);

        session.submit().await.unwrap();
        assert_eq!(
            *seen.lock(),
            vec![
                SubmissionPhase::Validating,
                SubmissionPhase::Building,
                SubmissionPhase::Sending,
                SubmissionPhase::Succeeded,
                SubmissionPhase::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_setter_reports_status() {
        let session = Session::new(EchoService::default());
        session.ingest_csv(CSV).unwrap();

        let err = session
            .update_config(|selector| selector.set_y_variable(Some("profit".into())))
            .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert_eq!(session.status().unwrap().code.as_deref(), Some("COLUMN_NOT_FOUND"));
        assert_eq!(session.config().y_variable, None);
    }

    #[test]
    fn test_ingest_csv_reports_malformed_rows() {
        let session = Session::new(EchoService::default());
        let report = session.ingest_csv("a,b\n1,2\n3\n").unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(session.dataset().len(), 1);
        let status = session.status().unwrap();
        assert_eq!(status.level, StatusLevel::Warning);
        assert_eq!(status.code.as_deref(), Some("PARSE_ERROR"));
        assert!(status.message.contains("skipped 1 malformed rows"));
        assert!(status.message.contains("line 3"));
    }

    #[test]
    fn test_partially_failed_edit_changes_nothing() {
        let session = Session::new(EchoService::default());
        session.ingest_csv(CSV).unwrap();

        let err = session
            .update_config(|selector| {
                selector.set_date_column(Some("date".into()))?;
                selector.set_x_variables(["price"])?;
                selector.set_y_variable(Some("nope".into()))
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert_eq!(session.config(), FeatureConfig::default());
        assert_eq!(session.status().unwrap().code.as_deref(), Some("COLUMN_NOT_FOUND"));
    }
}
