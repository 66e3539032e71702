use thiserror::Error;

/// A single field that failed validation, with the reason it was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Client,
    Unavailable,
    Prediction,
    Internal,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("{}", join_field_errors(.errors))]
    InvalidFields { errors: Vec<FieldError> },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{artifact} not loaded")]
    ModelUnavailable { artifact: String },

    #[error("{context}: {message}")]
    Prediction { context: String, message: String },

    #[error("Artifact error in {path}: {message}")]
    Artifact { path: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for {field} ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Remote inference request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ServiceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn unavailable(artifact: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            artifact: artifact.into(),
        }
    }

    /// Wraps an underlying failure with the operation that was running.
    pub fn prediction(context: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::Prediction {
            context: context.into(),
            message: source.to_string(),
        }
    }

    pub fn artifact(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingFields { .. } | Self::InvalidFields { .. } | Self::InvalidInput { .. } => {
                ErrorCategory::Client
            }
            Self::ModelUnavailable { .. } => ErrorCategory::Unavailable,
            Self::Prediction { .. } => ErrorCategory::Prediction,
            _ => ErrorCategory::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Client
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ServiceError>;
