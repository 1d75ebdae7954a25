//! Trait seam between the session and the modeling service.

use crate::error::Result;
use crate::types::{PredictionRequest, PredictionResponse};
use std::future::Future;

/// A backend that can turn a [`PredictionRequest`] into predictions.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`, and the returned future `Send`, so
/// submissions can run on any tokio worker.
///
/// # Errors
///
/// Implementations report connectivity failures as
/// [`FincastError::Network`](crate::FincastError::Network) and rejections as
/// [`FincastError::Service`](crate::FincastError::Service). They must not
/// retry; the session treats every failure as terminal.
pub trait ModelService: Send + Sync {
    /// Issue exactly one prediction request.
    fn predict(
        &self,
        request: &PredictionRequest,
    ) -> impl Future<Output = Result<PredictionResponse>> + Send;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
