//! Building the `POST /predict` payload.

use crate::error::ValidationError;
use crate::features::FeatureSelector;
use crate::types::{Dataset, FeatureConfig, PredictionRequest};

/// Turns a dataset and a feature configuration into a [`PredictionRequest`].
///
/// This is also the validation gate: no request exists unless the date
/// column and target are set, at least one predictor is chosen and the
/// dataset has rows.
pub struct RequestBuilder;

impl RequestBuilder {
    /// Validate the selector against `dataset` and build the payload.
    pub fn build(
        dataset: &Dataset,
        selector: &FeatureSelector,
    ) -> Result<PredictionRequest, ValidationError> {
        let config = selector.validate(dataset)?;
        Self::from_config(dataset.clone(), config)
    }

    /// Map an already-validated configuration onto the wire payload, field
    /// for field.
    pub fn from_config(
        data: Dataset,
        config: FeatureConfig,
    ) -> Result<PredictionRequest, ValidationError> {
        let FeatureConfig {
            date_column,
            category_columns,
            y_variable,
            x_variables,
            selected_features,
            model_type,
        } = config;

        let date_column = date_column.ok_or(ValidationError::MissingDateColumn)?;
        let y_variable = y_variable.ok_or(ValidationError::MissingTarget)?;
        if x_variables.is_empty() {
            return Err(ValidationError::NoPredictors);
        }
        if data.is_empty() {
            return Err(ValidationError::EmptyDataset);
        }

        Ok(PredictionRequest {
            data,
            date_column,
            category_columns,
            y_variable,
            x_variables,
            selected_features,
            model_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellValue, ModelType, Row};
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        vec![
            [
                ("date", CellValue::text("2024-01-01")),
                ("amount", CellValue::text("10")),
                ("category", CellValue::text("food")),
                ("price", CellValue::text("2.5")),
            ]
            .into_iter()
            .collect::<Row>(),
        ]
        .into()
    }

    fn selector() -> FeatureSelector {
        let mut selector = FeatureSelector::new();
        selector.sync_columns(&dataset().columns());
        selector.set_date_column(Some("date".into())).unwrap();
        selector.set_y_variable(Some("amount".into())).unwrap();
        selector.set_x_variables(["price", "category"]).unwrap();
        selector.set_category_columns(["category"]).unwrap();
        selector.set_feature_options(vec!["lag_1".into()]);
        selector.set_selected_features(["lag_1"]).unwrap();
        selector.set_model_type(ModelType::RandomForest);
        selector
    }

    #[test]
    fn test_fields_map_one_to_one() {
        let selector = selector();
        let request = RequestBuilder::build(&dataset(), &selector).unwrap();
        let config = selector.config();

        assert_eq!(Some(&request.date_column), config.date_column.as_ref());
        assert_eq!(Some(&request.y_variable), config.y_variable.as_ref());
        assert_eq!(request.x_variables, config.x_variables);
        assert_eq!(request.category_columns, config.category_columns);
        assert_eq!(request.selected_features, config.selected_features);
        assert_eq!(request.model_type, config.model_type);
        assert_eq!(request.data, dataset());
    }

    #[test]
    fn test_wire_field_names() {
        let request = RequestBuilder::build(&dataset(), &selector()).unwrap();
        let value = serde_json::to_value(&request).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "category_columns",
                "data",
                "date_column",
                "model_type",
                "selected_features",
                "x_variables",
                "y_variable",
            ]
        );
        assert_eq!(object["model_type"], "random_forest");
        assert_eq!(object["data"][0]["amount"], "10");
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut selector = selector();
        selector.set_x_variables(Vec::<String>::new()).unwrap();
        assert_eq!(
            RequestBuilder::build(&dataset(), &selector),
            Err(ValidationError::NoPredictors)
        );
    }

    #[test]
    fn test_from_config_rejects_empty_data() {
        let config = selector().config().clone();
        assert_eq!(
            RequestBuilder::from_config(Dataset::default(), config),
            Err(ValidationError::EmptyDataset)
        );
    }
}
