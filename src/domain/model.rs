use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(Self::Positive),
            "NEGATIVE" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// Output of the external sentiment classifier; `score` is the confidence of `label`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f64,
}

/// A 224x224 RGB image, HWC order, already scaled for the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ImageTensor {
    pub const CHANNELS: usize = 3;

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let offset = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePrediction {
    pub description: String,
    pub confidence: f64,
}

/// One projected day of a forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: String,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastSeries {
    Donations,
    Requests,
}

impl ForecastSeries {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Donations => "donation",
            Self::Requests => "request",
        }
    }
}

/// Validated `/predict_duration` payload, still in request units.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationInput {
    pub distance_km: f64,
    pub osrm_duration_seconds: f64,
    pub hour: i64,
    pub weather: String,
    pub vehicle_type: String,
}

/// Feature vector handed to the traffic duration regressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationFeatures {
    pub distance_meters: f64,
    pub osrm_duration_minutes: f64,
    pub hour_normalized: f64,
    pub weather_code: i64,
    pub vehicle_code: i64,
}

impl DurationFeatures {
    pub const N_FEATURES: usize = 5;

    pub fn to_vector(&self) -> [f64; Self::N_FEATURES] {
        [
            self.distance_meters,
            self.osrm_duration_minutes,
            self.hour_normalized,
            self.weather_code as f64,
            self.vehicle_code as f64,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatisfactionInput {
    pub rating: f64,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodTarget {
    Quantity,
    Waste,
}

/// Validated tabular payload for the food quantity and waste regressors.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodDemandInput {
    pub guests: f64,
    pub quantity: Option<f64>,
    /// (field, category value); `None` when the payload carried null.
    pub categories: Vec<(String, Option<String>)>,
}
