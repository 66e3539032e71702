//! Tabular preprocessing artifacts: scaler, canonical columns, importances.

use crate::adapters::read_artifact;
use crate::utils::error::{Result, ServiceError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(ServiceError::artifact(
                "standard scaler",
                format!(
                    "mean has {} entries but scale has {}",
                    mean.len(),
                    scale.len()
                ),
            ));
        }
        Ok(Self { mean, scale })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_artifact(path.as_ref(), Self::from_json_str)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: StandardScaler = serde_json::from_str(content)?;
        Self::new(raw.mean, raw.scale)
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// `(x - mean) / scale`; a zero scale leaves the centered value as is.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.mean.len() {
            return Err(ServiceError::prediction(
                "Feature scaling failed",
                format!(
                    "expected {} features, got {}",
                    self.mean.len(),
                    features.len()
                ),
            ));
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

/// Canonical, ordered feature column names expected by the food regressors.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumns(Vec<String>);

impl FeatureColumns {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ServiceError::artifact("feature columns", "column list is empty"));
        }
        Ok(Self(columns))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_artifact(path.as_ref(), Self::from_json_str)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::new(serde_json::from_str(content)?)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Deserialize)]
struct ImportanceRow {
    feature: String,
    importance: f64,
}

/// Precomputed feature → importance table for the waste model.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance(BTreeMap<String, f64>);

impl FeatureImportance {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_artifact(path.as_ref(), Self::from_csv_str)
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut table = BTreeMap::new();
        for row in reader.deserialize::<ImportanceRow>() {
            let row = row?;
            table.insert(row.feature, row.importance);
        }
        Ok(Self(table))
    }

    pub fn factors(&self) -> &BTreeMap<String, f64> {
        &self.0
    }
}
