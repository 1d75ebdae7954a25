//! Submission phases and phase reporting.
//!
//! A submission moves through
//! `Idle → Validating → Building → Sending → {Succeeded, Failed} → Idle`.
//! A validation failure goes straight from `Validating` back to `Idle`.

use super::RequestId;
use serde::{Deserialize, Serialize};

/// Where the latest submission currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Validating,
    Building,
    /// Waiting on the modeling service; the only suspension point.
    Sending,
    Succeeded,
    Failed,
}

impl SubmissionPhase {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Validating => "Validating Configuration",
            Self::Building => "Building Request",
            Self::Sending => "Waiting for Predictions",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }
}

/// One phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseUpdate {
    /// `None` until the submission has passed validation and been issued an id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub phase: SubmissionPhase,
    pub message: String,
}

impl PhaseUpdate {
    pub fn new(
        request_id: Option<RequestId>,
        phase: SubmissionPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            phase,
            message: message.into(),
        }
    }
}

/// Receiver of phase transitions.
///
/// Updates are delivered after the session lock is released, so an
/// implementation may call back into the session.
///
/// # Example
///
/// ```rust,ignore
/// struct LogReporter;
///
/// impl PhaseReporter for LogReporter {
///     fn report(&self, update: PhaseUpdate) {
///         tracing::info!("[{}] {}", update.phase.display_name(), update.message);
///     }
/// }
/// ```
pub trait PhaseReporter: Send + Sync {
    fn report(&self, update: PhaseUpdate);
}

/// [`PhaseReporter`] backed by a closure.
pub struct ClosurePhaseReporter<F>
where
    F: Fn(PhaseUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosurePhaseReporter<F>
where
    F: Fn(PhaseUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> PhaseReporter for ClosurePhaseReporter<F>
where
    F: Fn(PhaseUpdate) + Send + Sync,
{
    fn report(&self, update: PhaseUpdate) {
        (self.callback)(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_phase_json_values() {
        let expectations = [
            (SubmissionPhase::Idle, "\"idle\""),
            (SubmissionPhase::Validating, "\"validating\""),
            (SubmissionPhase::Building, "\"building\""),
            (SubmissionPhase::Sending, "\"sending\""),
            (SubmissionPhase::Succeeded, "\"succeeded\""),
            (SubmissionPhase::Failed, "\"failed\""),
        ];
        for (phase, expected) in expectations {
            assert_eq!(serde_json::to_string(&phase).unwrap(), expected);
        }
    }

    #[test]
    fn test_update_without_id_omits_field() {
        let update = PhaseUpdate::new(None, SubmissionPhase::Validating, "checking");
        let json = serde_json::to_string(&update).unwrap();
        assert!(!json.contains("request_id"));
    }

    #[test]
    fn test_closure_reporter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let reporter = ClosurePhaseReporter::new(move |_update| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(PhaseUpdate::new(None, SubmissionPhase::Validating, "a"));
        reporter.report(PhaseUpdate::new(None, SubmissionPhase::Idle, "b"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
