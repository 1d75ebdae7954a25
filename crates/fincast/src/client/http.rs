//! HTTP implementation of [`ModelService`] on top of `reqwest`.

use super::ModelService;
use crate::config::ServiceConfig;
use crate::error::{FincastError, Result};
use crate::types::{Dataset, PredictionRequest, PredictionResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Failure body returned by the service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: Dataset,
}

#[derive(Debug, Deserialize)]
struct WelcomeResponse {
    message: String,
}

/// Client for the modeling service's HTTP API.
///
/// # Example
///
/// ```rust,ignore
/// use fincast::{HttpModelService, ServiceConfig};
///
/// let service = HttpModelService::new(ServiceConfig::default())?;
/// println!("{}", service.ping().await?);
/// ```
pub struct HttpModelService {
    config: ServiceConfig,
    client: Client,
}

impl HttpModelService {
    /// # Errors
    ///
    /// Returns [`FincastError::InvalidConfig`] if the configuration does not
    /// validate or the HTTP client cannot be created.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                FincastError::InvalidConfig(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Legacy path: let the service parse an uploaded CSV file.
    pub async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<Dataset> {
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| FincastError::InvalidConfig(format!("Invalid upload part: {}", e)))?;
        let form = Form::new().part("file", part);

        let url = self.config.endpoint("/upload");
        debug!("POST {} ({})", url, file_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let body: UploadResponse = read_json(response).await?;

        info!("Service parsed {} rows from {}", body.data.len(), file_name);
        Ok(body.data)
    }

    /// Health probe: returns the service's welcome message.
    pub async fn ping(&self) -> Result<String> {
        let url = self.config.endpoint("/");
        let response = self.client.get(&url).send().await?;
        let body: WelcomeResponse = read_json(response).await?;
        Ok(body.message)
    }
}

impl ModelService for HttpModelService {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let url = self.config.endpoint("/predict");
        info!(
            "POST {}: {} rows, target '{}', {} predictors, model {}",
            url,
            request.data.len(),
            request.y_variable,
            request.x_variables.len(),
            request.model_type
        );

        let response = self.client.post(&url).json(request).send().await?;
        let predictions: PredictionResponse = read_json(response).await?;

        debug!(
            "Received {} predictions, {} metric entries",
            predictions.predictions.len(),
            predictions.metrics.len()
        );
        Ok(predictions)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Decode a JSON body, mapping failures onto the error taxonomy.
///
/// Non-2xx responses become [`FincastError::Service`] carrying the body's
/// `error` message when there is one. A 2xx body that does not decode is
/// also a service error: the service answered, but outside its contract.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let error = service_failure(status, &body);
        warn!("Service responded {}: {}", status, error);
        return Err(error);
    }

    serde_json::from_str(&body).map_err(|e| {
        FincastError::service(
            Some(status.as_u16()),
            format!("malformed response body: {}", e),
        )
    })
}

fn service_failure(status: StatusCode, body: &str) -> FincastError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    FincastError::service(Some(status.as_u16()), message)
}
