//! Feed-forward dense network exported layer by layer, used for the food
//! quantity and food waste regressors.

use crate::adapters::read_artifact;
use crate::domain::ports::Predictor;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
        }
    }
}

fn default_activation() -> Activation {
    Activation::Linear
}

/// `weights` is shaped `[inputs][units]`.
#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default = "default_activation")]
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.len()
    }

    fn units(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        out.into_iter().map(|v| self.activation.apply(v)).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenseRegressor {
    layers: Vec<DenseLayer>,
}

impl DenseRegressor {
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        let model = Self { layers };
        model.validate()?;
        Ok(model)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_artifact(path.as_ref(), Self::from_json_str)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(content)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| ServiceError::artifact("dense network", message);

        if self.layers.is_empty() {
            return Err(invalid("network has no layers".to_string()));
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.units() == 0 || layer.inputs() == 0 {
                return Err(invalid(format!("layer {i} is empty")));
            }
            if let Some(row) = layer.weights.iter().position(|r| r.len() != layer.units()) {
                return Err(invalid(format!(
                    "layer {i} weight row {row} does not match {} units",
                    layer.units()
                )));
            }
            if i > 0 && self.layers[i - 1].units() != layer.inputs() {
                return Err(invalid(format!(
                    "layer {i} expects {} inputs but the previous layer has {} units",
                    layer.inputs(),
                    self.layers[i - 1].units()
                )));
            }
        }

        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].inputs()
    }

    pub fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.input_size() {
            return Err(ServiceError::prediction(
                "Dense network prediction failed",
                format!("expected {} features, got {}", self.input_size(), features.len()),
            ));
        }

        let mut activations = features.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        Ok(activations[0])
    }
}

#[async_trait]
impl Predictor for DenseRegressor {
    type Input = [f64];
    type Output = f64;

    async fn predict(&self, input: &[f64]) -> Result<f64> {
        self.predict_one(input)
    }
}
