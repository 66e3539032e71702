//! Request-level orchestration shared by every endpoint: availability check,
//! validation, feature building, inference and response clamping.

use crate::core::gateway::{ArtifactState, ModelRegistry};
use crate::core::normalizer::{duration_features, food_feature_vector, image_tensor_from_bytes};
use crate::core::satisfaction::SatisfactionScorer;
use crate::core::validator::{parse_forecast_days, validate_duration, validate_food, validate_satisfaction};
use crate::domain::model::{FoodTarget, ForecastRow, ForecastSeries, ImagePrediction};
use crate::utils::error::{Result, ServiceError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lower bound on a predicted trip duration, in seconds.
pub const MIN_DURATION_SECONDS: f64 = 60.0;

/// Logs the stage a request reached before it failed, then hands the error back.
fn failed(stage: &'static str, payload: &Value, error: ServiceError) -> ServiceError {
    if error.is_client_error() {
        tracing::warn!(stage, payload = %payload, error = %error, "Request rejected");
    } else {
        tracing::error!(stage, payload = %payload, error = %error, "Request failed");
    }
    error
}

/// Keeps the inner message, adds the operation in front of it.
fn in_context(context: &str, error: ServiceError) -> ServiceError {
    match error {
        e @ (ServiceError::MissingFields { .. }
        | ServiceError::InvalidFields { .. }
        | ServiceError::InvalidInput { .. }
        | ServiceError::ModelUnavailable { .. }) => e,
        other => ServiceError::prediction(context, other),
    }
}

fn food_context(target: FoodTarget) -> &'static str {
    match target {
        FoodTarget::Quantity => "Failed to forecast food demand",
        FoodTarget::Waste => "Failed to predict food waste",
    }
}

#[derive(Clone)]
pub struct InferenceService {
    registry: Arc<ModelRegistry>,
    scorer: SatisfactionScorer,
}

impl InferenceService {
    pub fn new(registry: ModelRegistry) -> Self {
        let scorer = SatisfactionScorer::new(registry.sentiment_classifier());
        if !scorer.has_classifier() {
            tracing::warn!("No sentiment classifier, satisfaction scores use a neutral sentiment");
        }
        Self {
            registry: Arc::new(registry),
            scorer,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub async fn analyze_image(&self, bytes: &[u8]) -> Result<Vec<ImagePrediction>> {
        let payload = serde_json::json!({ "upload_bytes": bytes.len() });
        tracing::info!(payload = %payload, "Received image for classification");

        let classifier = self
            .registry
            .image_classifier()
            .map_err(|e| failed("availability", &payload, e))?;

        let tensor = image_tensor_from_bytes(bytes).map_err(|e| failed("decoding", &payload, e))?;

        let predictions = classifier
            .predict(&tensor)
            .await
            .map_err(|e| failed("prediction", &payload, e))?;

        tracing::debug!(count = predictions.len(), "Image classified");
        Ok(predictions)
    }

    /// Model availability is checked before `days`, so a missing model is a
    /// 500 whatever the query says.
    pub async fn forecast(&self, series: ForecastSeries, days: Option<&str>) -> Result<Vec<ForecastRow>> {
        let payload = serde_json::json!({ "series": series.label(), "days": days });
        tracing::info!(payload = %payload, "Received forecast request");

        let forecaster = self
            .registry
            .forecaster(series)
            .map_err(|e| failed("availability", &payload, e))?;

        let horizon = parse_forecast_days(days).map_err(|e| failed("validation", &payload, e))?;

        let context = format!("Failed to generate {} forecast", series.label());
        let rows = forecaster
            .predict(&horizon)
            .await
            .map_err(|e| failed("prediction", &payload, in_context(&context, e)))?;

        Ok(rows)
    }

    /// Predicted trip duration in seconds, never below one minute.
    pub async fn predict_duration(&self, payload: &Value) -> Result<f64> {
        tracing::info!(payload = %payload, "Received data for duration prediction");

        let models = self
            .registry
            .traffic()
            .map_err(|e| failed("availability", payload, e))?;

        let input = validate_duration(payload, models.weather.as_ref(), models.vehicle.as_ref())
            .map_err(|e| failed("validation", payload, e))?;

        // 驗證階段已確認類別存在
        let codes = models
            .weather
            .encode(&input.weather)
            .zip(models.vehicle.encode(&input.vehicle_type))
            .ok_or_else(|| {
                failed(
                    "encoding",
                    payload,
                    ServiceError::invalid_input("Invalid weather or vehicle type"),
                )
            })?;

        let features = duration_features(&input, codes.0, codes.1);
        tracing::debug!(?features, "Duration features");

        let minutes = models
            .regressor
            .predict(&features.to_vector())
            .await
            .map_err(|e| failed("prediction", payload, in_context("Failed to predict duration", e)))?;

        Ok((minutes * 60.0).max(MIN_DURATION_SECONDS))
    }

    pub async fn compute_satisfaction(&self, payload: &Value) -> Result<u8> {
        tracing::info!(payload = %payload, "Received data for satisfaction score");

        let input = validate_satisfaction(payload).map_err(|e| failed("validation", payload, e))?;
        Ok(self.scorer.score(input.rating, &input.comment).await)
    }

    /// Food quantity or waste prediction, clamped to be non-negative.
    pub async fn predict_food(&self, target: FoodTarget, payload: &Value) -> Result<f64> {
        tracing::info!(payload = %payload, ?target, "Received data for food prediction");

        let models = self
            .registry
            .food(target)
            .map_err(|e| failed("availability", payload, e))?;

        let input = validate_food(payload, target).map_err(|e| failed("validation", payload, e))?;

        let mut features = food_feature_vector(&input, models.columns.as_slice());
        if let Some(scaler) = &models.scaler {
            features = scaler
                .transform(&features)
                .map_err(|e| failed("scaling", payload, in_context(food_context(target), e)))?;
        }

        let prediction = models
            .regressor
            .predict(&features)
            .await
            .map_err(|e| failed("prediction", payload, in_context(food_context(target), e)))?;

        Ok(prediction.max(0.0))
    }

    pub fn waste_factors(&self) -> Result<BTreeMap<String, f64>> {
        let table = self
            .registry
            .feature_importance()
            .map_err(|e| failed("availability", &Value::Null, e))?;
        Ok(table.factors().clone())
    }

    pub fn artifact_status(&self) -> Vec<(&'static str, ArtifactState)> {
        self.registry.states()
    }
}
