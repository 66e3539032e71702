//! Capability registry: every model, encoder and table the endpoints need,
//! loaded once at startup and read-only afterwards.

use crate::adapters::tables::{FeatureColumns, FeatureImportance, StandardScaler};
use crate::domain::model::{FoodTarget, ForecastSeries};
use crate::domain::ports::{CategoryEncoder, Forecaster, ImageClassifier, Regressor, SentimentClassifier};
use crate::utils::error::{Result, ServiceError};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Loaded,
    Failed,
    NotConfigured,
}

/// One registry entry. `Failed` keeps the load error for diagnostics.
pub enum Slot<T: ?Sized> {
    Loaded(Arc<T>),
    Failed(String),
    NotConfigured,
}

impl<T: ?Sized> Clone for Slot<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loaded(value) => Self::Loaded(Arc::clone(value)),
            Self::Failed(reason) => Self::Failed(reason.clone()),
            Self::NotConfigured => Self::NotConfigured,
        }
    }
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Self::NotConfigured
    }
}

impl<T: ?Sized> Slot<T> {
    pub fn get(&self) -> Option<&Arc<T>> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn state(&self) -> ArtifactState {
        match self {
            Self::Loaded(_) => ArtifactState::Loaded,
            Self::Failed(_) => ArtifactState::Failed,
            Self::NotConfigured => ArtifactState::NotConfigured,
        }
    }

    pub fn require(&self, artifact: &str) -> Result<Arc<T>> {
        self.get().cloned().ok_or_else(|| ServiceError::unavailable(artifact))
    }

    /// Not configured is fine, configured-but-failed is not.
    pub fn optional(&self, artifact: &str) -> Result<Option<Arc<T>>> {
        match self {
            Self::Loaded(value) => Ok(Some(Arc::clone(value))),
            Self::NotConfigured => Ok(None),
            Self::Failed(_) => Err(ServiceError::unavailable(artifact)),
        }
    }
}

pub struct TrafficModels {
    pub regressor: Arc<Regressor>,
    pub weather: Arc<dyn CategoryEncoder>,
    pub vehicle: Arc<dyn CategoryEncoder>,
}

pub struct FoodModels {
    pub regressor: Arc<Regressor>,
    pub columns: Arc<FeatureColumns>,
    pub scaler: Option<Arc<StandardScaler>>,
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    pub image_classifier: Slot<ImageClassifier>,
    pub donation_forecaster: Slot<Forecaster>,
    pub request_forecaster: Slot<Forecaster>,
    pub traffic_model: Slot<Regressor>,
    pub weather_encoder: Slot<dyn CategoryEncoder>,
    pub vehicle_encoder: Slot<dyn CategoryEncoder>,
    pub food_quantity_model: Slot<Regressor>,
    pub food_waste_model: Slot<Regressor>,
    pub feature_scaler: Slot<StandardScaler>,
    pub feature_columns: Slot<FeatureColumns>,
    pub feature_importance: Slot<FeatureImportance>,
    pub sentiment_classifier: Slot<SentimentClassifier>,
}

impl ModelRegistry {
    pub fn image_classifier(&self) -> Result<Arc<ImageClassifier>> {
        self.image_classifier.require("Image classification model")
    }

    pub fn forecaster(&self, series: ForecastSeries) -> Result<Arc<Forecaster>> {
        match series {
            ForecastSeries::Donations => self.donation_forecaster.require("Donation forecast model"),
            ForecastSeries::Requests => self.request_forecaster.require("Request forecast model"),
        }
    }

    pub fn traffic(&self) -> Result<TrafficModels> {
        Ok(TrafficModels {
            regressor: self.traffic_model.require("Traffic prediction model")?,
            weather: self.weather_encoder.require("Weather encoder")?,
            vehicle: self.vehicle_encoder.require("Vehicle type encoder")?,
        })
    }

    pub fn food(&self, target: FoodTarget) -> Result<FoodModels> {
        let regressor = match target {
            FoodTarget::Quantity => self.food_quantity_model.require("Food demand model")?,
            FoodTarget::Waste => self.food_waste_model.require("Food waste model")?,
        };
        Ok(FoodModels {
            regressor,
            columns: self.feature_columns.require("Feature columns")?,
            scaler: self.feature_scaler.optional("Feature scaler")?,
        })
    }

    pub fn feature_importance(&self) -> Result<Arc<FeatureImportance>> {
        self.feature_importance.require("Feature importance data")
    }

    /// `None` means satisfaction scoring uses a neutral sentiment.
    pub fn sentiment_classifier(&self) -> Option<Arc<SentimentClassifier>> {
        self.sentiment_classifier.get().cloned()
    }

    pub fn states(&self) -> Vec<(&'static str, ArtifactState)> {
        vec![
            ("image_classifier", self.image_classifier.state()),
            ("donation_forecaster", self.donation_forecaster.state()),
            ("request_forecaster", self.request_forecaster.state()),
            ("traffic_model", self.traffic_model.state()),
            ("weather_encoder", self.weather_encoder.state()),
            ("vehicle_encoder", self.vehicle_encoder.state()),
            ("food_quantity_model", self.food_quantity_model.state()),
            ("food_waste_model", self.food_waste_model.state()),
            ("feature_scaler", self.feature_scaler.state()),
            ("feature_columns", self.feature_columns.state()),
            ("feature_importance", self.feature_importance.state()),
            ("sentiment_classifier", self.sentiment_classifier.state()),
        ]
    }
}
