use crate::adapters::read_artifact;
use crate::domain::model::{ImagePrediction, ImageTensor};
use crate::domain::ports::Predictor;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const TOP_K: usize = 3;

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Vec<Vec<[f32; 3]>>>,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f64>>,
}

/// One class label per line; blank lines are ignored.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    read_artifact(path.as_ref(), parse_labels)
}

pub fn parse_labels(content: &str) -> Result<Vec<String>> {
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(ServiceError::artifact("image labels", "label file is empty"));
    }
    Ok(labels)
}

/// Highest-probability labels first.
pub fn top_k(probabilities: &[f64], labels: &[String], k: usize) -> Vec<ImagePrediction> {
    let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .take(k)
        .map(|(index, confidence)| ImagePrediction {
            description: labels[index].clone(),
            confidence,
        })
        .collect()
}

fn to_instance(tensor: &ImageTensor) -> Vec<Vec<[f32; 3]>> {
    tensor
        .data
        .chunks_exact(ImageTensor::CHANNELS)
        .map(|px| [px[0], px[1], px[2]])
        .collect::<Vec<_>>()
        .chunks(tensor.width as usize)
        .map(|row| row.to_vec())
        .collect()
}

/// Image classifier behind a model-serving REST endpoint
/// (`{"instances": [...]}` → `{"predictions": [[...]]}`).
pub struct RemoteImageClassifier {
    client: Client,
    endpoint: String,
    labels: Vec<String>,
}

impl RemoteImageClassifier {
    pub fn new(endpoint: String, labels: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            labels,
        })
    }

    async fn classify(&self, tensor: &ImageTensor) -> Result<Vec<ImagePrediction>> {
        let body = PredictRequest {
            instances: vec![to_instance(tensor)],
        };

        tracing::debug!("Requesting image classification from: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: PredictResponse = response.json().await?;
        let probabilities = parsed
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::prediction("Image classification failed", "empty predictions"))?;

        if probabilities.len() != self.labels.len() {
            return Err(ServiceError::prediction(
                "Image classification failed",
                format!(
                    "model returned {} classes but {} labels are loaded",
                    probabilities.len(),
                    self.labels.len()
                ),
            ));
        }

        Ok(top_k(&probabilities, &self.labels, TOP_K))
    }
}

#[async_trait]
impl Predictor for RemoteImageClassifier {
    type Input = ImageTensor;
    type Output = Vec<ImagePrediction>;

    async fn predict(&self, input: &ImageTensor) -> Result<Vec<ImagePrediction>> {
        self.classify(input).await.map_err(|e| match e {
            ServiceError::Prediction { .. } => e,
            other => ServiceError::prediction("Image classification failed", other),
        })
    }
}
