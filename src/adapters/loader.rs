//! Startup loading: every configured artifact is read once and placed in the
//! registry. A failure marks that artifact unavailable instead of aborting, so
//! the endpoints that do not depend on it keep working.

use crate::adapters::dense::DenseRegressor;
use crate::adapters::encoder::LabelEncoder;
use crate::adapters::forecast::TrendForecaster;
use crate::adapters::gbdt::TreeEnsembleRegressor;
use crate::adapters::sentiment::RemoteSentimentClassifier;
use crate::adapters::tables::{FeatureColumns, FeatureImportance, StandardScaler};
use crate::adapters::vision::{load_labels, RemoteImageClassifier};
use crate::config::ServiceConfig;
use crate::core::gateway::{ArtifactState, ModelRegistry, Slot};
use crate::domain::model::DurationFeatures;
use crate::domain::ports::{CategoryEncoder, Forecaster, ImageClassifier, Regressor, SentimentClassifier};
use crate::utils::error::{Result, ServiceError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct ArtifactLoader<'a> {
    config: &'a ServiceConfig,
}

impl<'a> ArtifactLoader<'a> {
    pub fn new(config: &'a ServiceConfig) -> Self {
        Self { config }
    }

    pub fn load(&self) -> ModelRegistry {
        let files = &self.config.artifacts;
        info!(dir = %files.dir, "Loading model artifacts");

        let feature_columns = self.file("feature_columns", &files.feature_columns, |p| {
            Ok(Arc::new(FeatureColumns::from_file(p)?))
        });
        // 食物模型與 scaler 的輸入寬度必須等於欄位數
        let food_inputs = match &feature_columns {
            Slot::Loaded(columns) => Some(columns.as_slice().len()),
            _ => None,
        };

        let registry = ModelRegistry {
            image_classifier: self.image_classifier(),
            donation_forecaster: self.file("donation_forecaster", &files.donation_forecaster, |p| {
                Ok(Arc::new(TrendForecaster::from_file(p)?) as Arc<Forecaster>)
            }),
            request_forecaster: self.file("request_forecaster", &files.request_forecaster, |p| {
                Ok(Arc::new(TrendForecaster::from_file(p)?) as Arc<Forecaster>)
            }),
            traffic_model: self.file("traffic_model", &files.traffic_model, |p| {
                let model = TreeEnsembleRegressor::from_file(p)?;
                check_input_width(p, model.n_features, DurationFeatures::N_FEATURES)?;
                Ok(Arc::new(model) as Arc<Regressor>)
            }),
            weather_encoder: self.file("weather_encoder", &files.weather_encoder, |p| {
                Ok(Arc::new(LabelEncoder::from_file(p)?) as Arc<dyn CategoryEncoder>)
            }),
            vehicle_encoder: self.file("vehicle_encoder", &files.vehicle_encoder, |p| {
                Ok(Arc::new(LabelEncoder::from_file(p)?) as Arc<dyn CategoryEncoder>)
            }),
            food_quantity_model: self.file("food_quantity_model", &files.food_quantity_model, |p| {
                let model = DenseRegressor::from_file(p)?;
                if let Some(expected) = food_inputs {
                    check_input_width(p, model.input_size(), expected)?;
                }
                Ok(Arc::new(model) as Arc<Regressor>)
            }),
            food_waste_model: self.file("food_waste_model", &files.food_waste_model, |p| {
                let model = DenseRegressor::from_file(p)?;
                if let Some(expected) = food_inputs {
                    check_input_width(p, model.input_size(), expected)?;
                }
                Ok(Arc::new(model) as Arc<Regressor>)
            }),
            feature_scaler: self.file("feature_scaler", &files.feature_scaler, |p| {
                let scaler = StandardScaler::from_file(p)?;
                if let Some(expected) = food_inputs {
                    check_input_width(p, scaler.n_features(), expected)?;
                }
                Ok(Arc::new(scaler))
            }),
            feature_columns,
            feature_importance: self.file("feature_importance", &files.feature_importance, |p| {
                Ok(Arc::new(FeatureImportance::from_file(p)?))
            }),
            sentiment_classifier: self.sentiment_classifier(),
        };

        let loaded = registry
            .states()
            .iter()
            .filter(|(_, state)| *state == ArtifactState::Loaded)
            .count();
        info!(loaded, total = registry.states().len(), "Artifact loading finished");

        registry
    }

    fn file<T: ?Sized>(
        &self,
        name: &str,
        file_name: &str,
        load: impl FnOnce(&Path) -> Result<Arc<T>>,
    ) -> Slot<T> {
        let Some(path) = self.config.artifacts.path(file_name) else {
            warn!(artifact = name, "Artifact not configured");
            return Slot::NotConfigured;
        };

        info!(artifact = name, path = %path.display(), "Loading artifact");
        into_slot(name, load(&path))
    }

    fn image_classifier(&self) -> Slot<ImageClassifier> {
        let name = "image_classifier";
        let settings = &self.config.image_classifier;

        let Some(endpoint) = self.config.image_classifier_endpoint() else {
            warn!(artifact = name, "Image classifier endpoint not configured");
            return Slot::NotConfigured;
        };

        let result = self
            .config
            .artifacts
            .path(&settings.labels)
            .ok_or_else(|| ServiceError::config("image_classifier.labels is empty"))
            .and_then(load_labels)
            .and_then(|labels| {
                info!(artifact = name, endpoint, classes = labels.len(), "Using remote image classifier");
                RemoteImageClassifier::new(
                    endpoint.to_string(),
                    labels,
                    Duration::from_secs(settings.timeout_seconds),
                )
            })
            .map(|classifier| Arc::new(classifier) as Arc<ImageClassifier>);

        into_slot(name, result)
    }

    fn sentiment_classifier(&self) -> Slot<SentimentClassifier> {
        let name = "sentiment_classifier";

        let Some(endpoint) = self.config.sentiment_endpoint() else {
            warn!(artifact = name, "Sentiment endpoint not configured, scores will use neutral sentiment");
            return Slot::NotConfigured;
        };

        info!(artifact = name, endpoint, "Using remote sentiment classifier");
        let result = RemoteSentimentClassifier::new(
            endpoint.to_string(),
            self.config.sentiment_api_token().map(str::to_string),
            Duration::from_secs(self.config.sentiment.timeout_seconds),
        )
        .map(|classifier| Arc::new(classifier) as Arc<SentimentClassifier>);

        into_slot(name, result)
    }
}

/// A model that cannot take the features the service builds is unusable.
fn check_input_width(path: &Path, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(ServiceError::artifact(
            path.display().to_string(),
            format!("expects {actual} input features but {expected} are supplied"),
        ));
    }
    Ok(())
}

fn into_slot<T: ?Sized>(name: &str, result: Result<Arc<T>>) -> Slot<T> {
    match result {
        Ok(value) => {
            info!(artifact = name, "Artifact loaded");
            Slot::Loaded(value)
        }
        Err(e) => {
            error!(artifact = name, error = %e, "Failed to load artifact");
            Slot::Failed(e.to_string())
        }
    }
}
