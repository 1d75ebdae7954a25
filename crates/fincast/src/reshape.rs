//! Reshaping a prediction response into per-chart view models.
//!
//! Three independent transforms feed the three visualizations:
//!
//! - forecast series (actual vs. predicted per row),
//! - error-metric series (MAE/RMSE per model),
//! - feature-importance series (one ordered series per model).
//!
//! They run once per successful response; the session caches the resulting
//! [`ChartData`] so renders never re-derive it. No cross-series checks are
//! made: model names in `metrics` need not match those in
//! `featureImportance`.

use crate::error::{FincastError, Result};
use crate::types::{CellValue, PredictionResponse};
use serde::{Deserialize, Serialize};

/// One point of the actual-vs-predicted chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub index: usize,
    pub actual: CellValue,
    /// `None` marks a gap: the row carried no prediction.
    pub predicted: Option<CellValue>,
}

impl ForecastPoint {
    pub fn is_gap(&self) -> bool {
        self.predicted.is_none()
    }
}

/// One bar group of the error-metric chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetricPoint {
    pub model: String,
    pub mae: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportancePoint {
    pub feature: String,
    pub importance: f64,
}

/// Feature importances of a single model, in the order the service sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceSeries {
    pub model: String,
    pub points: Vec<FeatureImportancePoint>,
}

/// All chart view models derived from one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub target: String,
    pub forecast: Vec<ForecastPoint>,
    pub error_metrics: Vec<ErrorMetricPoint>,
    pub feature_importance: Vec<FeatureImportanceSeries>,
}

impl ChartData {
    pub fn gap_count(&self) -> usize {
        self.forecast.iter().filter(|p| p.is_gap()).count()
    }
}

/// Stateless transforms from [`PredictionResponse`] to chart data.
pub struct ResultReshaper;

impl ResultReshaper {
    /// Run all three transforms.
    ///
    /// # Errors
    ///
    /// Returns [`FincastError::Service`] if a prediction row lacks the target
    /// field entirely; such a response is outside the service contract.
    pub fn reshape(response: &PredictionResponse) -> Result<ChartData> {
        Ok(ChartData {
            target: response.target.clone(),
            forecast: Self::forecast_series(response)?,
            error_metrics: Self::error_metric_series(response),
            feature_importance: Self::feature_importance_series(response),
        })
    }

    pub fn forecast_series(response: &PredictionResponse) -> Result<Vec<ForecastPoint>> {
        let target = response.target.as_str();
        let predicted_field = response.predicted_field();

        response
            .predictions
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let actual = row.get(target).cloned().ok_or_else(|| {
                    FincastError::service(
                        None,
                        format!("prediction row {} has no '{}' field", index, target),
                    )
                })?;
                let predicted = row
                    .get(&predicted_field)
                    .filter(|value| !value.is_empty())
                    .cloned();
                Ok(ForecastPoint {
                    index,
                    actual,
                    predicted,
                })
            })
            .collect()
    }

    pub fn error_metric_series(response: &PredictionResponse) -> Vec<ErrorMetricPoint> {
        response
            .metrics
            .iter()
            .map(|(model, metrics)| ErrorMetricPoint {
                model: model.to_string(),
                mae: metrics.mae,
                rmse: metrics.rmse,
            })
            .collect()
    }

    pub fn feature_importance_series(
        response: &PredictionResponse,
    ) -> Vec<FeatureImportanceSeries> {
        response
            .feature_importance
            .iter()
            .map(|(model, importance)| FeatureImportanceSeries {
                model: model.to_string(),
                points: importance
                    .iter()
                    .map(|(feature, value)| FeatureImportancePoint {
                        feature: feature.to_string(),
                        importance: *value,
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(json: &str) -> PredictionResponse {
        serde_json::from_str(json).expect("valid response json")
    }

    #[test]
    fn test_forecast_series_basic() {
        let response = response(r#"{"predictions": [{"y": 1, "predicted_y": 2}], "target": "y"}"#);
        let series = ResultReshaper::forecast_series(&response).unwrap();
        assert_eq!(
            series,
            vec![ForecastPoint {
                index: 0,
                actual: CellValue::Number(1.0),
                predicted: Some(CellValue::Number(2.0)),
            }]
        );
    }

    #[test]
    fn test_forecast_missing_prediction_is_gap() {
        let response = response(
            r#"{"predictions": [
                {"y": 1, "predicted_y": 2},
                {"y": 3},
                {"y": 4, "predicted_y": null}
            ], "target": "y"}"#,
        );
        let series = ResultReshaper::forecast_series(&response).unwrap();
        assert_eq!(series.len(), 3);
        assert!(!series[0].is_gap());
        assert!(series[1].is_gap());
        assert!(series[2].is_gap());
        assert_eq!(series[1].actual, CellValue::Number(3.0));
    }

    #[test]
    fn test_forecast_missing_target_is_service_error() {
        let response = response(r#"{"predictions": [{"y": 1}, {"predicted_y": 2}], "target": "y"}"#);
        let err = ResultReshaper::forecast_series(&response).unwrap_err();
        assert_eq!(err.error_code(), "SERVICE_ERROR");
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_error_metrics_preserve_order() {
        let response = response(
            r#"{"predictions": [], "target": "y",
                "metrics": {"rf": {"mae": 1.2, "rmse": 2.3}, "xgb": {"mae": 0.9, "rmse": 1.1}}}"#,
        );
        assert_eq!(
            ResultReshaper::error_metric_series(&response),
            vec![
                ErrorMetricPoint {
                    model: "rf".to_string(),
                    mae: 1.2,
                    rmse: 2.3
                },
                ErrorMetricPoint {
                    model: "xgb".to_string(),
                    mae: 0.9,
                    rmse: 1.1
                },
            ]
        );
    }

    #[test]
    fn test_feature_importance_per_model_order() {
        let response = response(
            r#"{"predictions": [], "target": "y",
                "featureImportance": {
                    "xgb": {"price": 0.6, "days": 0.3, "category": 0.1},
                    "rf": {"days": 0.5, "price": 0.5}
                }}"#,
        );
        let series = ResultReshaper::feature_importance_series(&response);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].model, "xgb");
        let features: Vec<&str> = series[0].points.iter().map(|p| p.feature.as_str()).collect();
        assert_eq!(features, vec!["price", "days", "category"]);
        assert_eq!(series[1].model, "rf");
        assert_eq!(series[1].points[0].importance, 0.5);
    }

    #[test]
    fn test_reshape_does_not_cross_validate_models() {
        let response = response(
            r#"{"predictions": [{"y": 1, "predicted_y": 1}], "target": "y",
                "metrics": {"linear": {"mae": 0.1, "rmse": 0.2}},
                "featureImportance": {"xgboost": {"x": 1.0}}}"#,
        );
        let charts = ResultReshaper::reshape(&response).unwrap();
        assert_eq!(charts.error_metrics[0].model, "linear");
        assert_eq!(charts.feature_importance[0].model, "xgboost");
        assert_eq!(charts.gap_count(), 0);
    }
}
