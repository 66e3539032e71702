//! Gradient-boosted tree ensemble used for traffic duration.
//!
//! Nodes are stored flat, node 0 is the root. Internal nodes split on
//! `feature_idx` and go left when `x <= threshold`; leaves carry `leaf`.

use crate::adapters::read_artifact;
use crate::domain::ports::Predictor;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    #[serde(default = "no_child")]
    pub left: i32,

    #[serde(default = "no_child")]
    pub right: i32,

    /// -1 for leaves
    #[serde(rename = "feature_idx", alias = "feature", default = "no_child")]
    pub feature_idx: i32,

    #[serde(default)]
    pub threshold: f64,

    #[serde(default)]
    pub leaf: Option<f64>,
}

fn no_child() -> i32 {
    -1
}

impl Node {
    pub fn internal(feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    pub fn leaf(value: f64) -> Self {
        Self {
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx < 0 || self.leaf.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("leaf node {i} has no leaf value"));
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                // children must point forward so traversal always terminates
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx as usize >= n_features {
                return Err(format!(
                    "node {i} splits on feature {} but the model has {n_features} features",
                    node.feature_idx
                ));
            }
        }

        Ok(())
    }

    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if let Some(value) = node.leaf {
                return value;
            }
            idx = if features[node.feature_idx as usize] <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeEnsembleRegressor {
    #[serde(default)]
    pub base_score: f64,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    pub n_features: usize,

    pub trees: Vec<Tree>,
}

fn default_learning_rate() -> f64 {
    1.0
}

impl TreeEnsembleRegressor {
    pub fn new(base_score: f64, learning_rate: f64, n_features: usize, trees: Vec<Tree>) -> Result<Self> {
        let model = Self {
            base_score,
            learning_rate,
            n_features,
            trees,
        };
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
        if self.trees.is_empty() {
            return Err(ServiceError::artifact("tree ensemble", "ensemble has no trees"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ServiceError::artifact("tree ensemble", format!("tree {i}: {e}")))?;
        }
        Ok(())
    }

    pub fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(ServiceError::prediction(
                "Tree ensemble prediction failed",
                format!("expected {} features, got {}", self.n_features, features.len()),
            ));
        }

        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(features)).sum();
        Ok(self.base_score + self.learning_rate * sum)
    }
}

#[async_trait]
impl Predictor for TreeEnsembleRegressor {
    type Input = [f64];
    type Output = f64;

    async fn predict(&self, input: &[f64]) -> Result<f64> {
        self.predict_one(input)
    }
}
