// Adapters layer: concrete artifact-backed predictors, lookup tables and the
// startup loader that wires them into the registry.

pub mod dense;
pub mod encoder;
pub mod forecast;
pub mod gbdt;
pub mod loader;
pub mod sentiment;
pub mod tables;
pub mod vision;

use crate::utils::error::{Result, ServiceError};
use std::path::Path;

/// Reads an artifact file and parses it, reporting every failure against the
/// file path.
pub(crate) fn read_artifact<T>(path: &Path, parse: impl FnOnce(&str) -> Result<T>) -> Result<T> {
    let location = path.display().to_string();

    let content = std::fs::read_to_string(path)
        .map_err(|e| ServiceError::artifact(&location, e.to_string()))?;

    parse(&content).map_err(|e| match e {
        ServiceError::Artifact { message, .. } => ServiceError::artifact(&location, message),
        other => ServiceError::artifact(&location, other.to_string()),
    })
}
