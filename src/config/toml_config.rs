use crate::utils::error::{Result, ServiceError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, validate_url,
    Validate,
};
use axum::http::HeaderValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// An optional string setting counts as configured only when it is non-empty
/// and has no unresolved `${VAR}` placeholder left in it.
pub fn configured(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.contains("${"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub image_classifier: ImageClassifierConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// File names are relative to `dir`; an empty name marks the artifact as not
/// configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: String,
    pub donation_forecaster: String,
    pub request_forecaster: String,
    pub traffic_model: String,
    pub weather_encoder: String,
    pub vehicle_encoder: String,
    pub food_quantity_model: String,
    pub food_waste_model: String,
    pub feature_scaler: String,
    pub feature_columns: String,
    pub feature_importance: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: "./models".to_string(),
            donation_forecaster: "donation_forecaster.json".to_string(),
            request_forecaster: "request_forecaster.json".to_string(),
            traffic_model: "traffic_model.json".to_string(),
            weather_encoder: "weather_encoder.json".to_string(),
            vehicle_encoder: "vehicle_encoder.json".to_string(),
            food_quantity_model: "food_quantity_model.json".to_string(),
            food_waste_model: "food_waste_model.json".to_string(),
            feature_scaler: "feature_scaler.json".to_string(),
            feature_columns: "feature_columns.json".to_string(),
            feature_importance: "feature_importance.csv".to_string(),
        }
    }
}

impl ArtifactsConfig {
    /// 解析成完整路徑，未設定時回傳 None
    pub fn path(&self, file_name: &str) -> Option<PathBuf> {
        configured(Some(file_name)).map(|name| Path::new(&self.dir).join(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageClassifierConfig {
    pub endpoint: Option<String>,
    /// Labels file, relative to the artifacts directory.
    pub labels: String,
    pub timeout_seconds: u64,
}

impl Default for ImageClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            labels: "image_labels.txt".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ServiceError::config(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| ServiceError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${SENTIMENT_API_TOKEN})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        // 使用正規表達式匹配 ${VAR_NAME} 格式
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ServiceError::config(format!("placeholder pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn image_classifier_endpoint(&self) -> Option<&str> {
        configured(self.image_classifier.endpoint.as_deref())
    }

    pub fn sentiment_endpoint(&self) -> Option<&str> {
        configured(self.sentiment.endpoint.as_deref())
    }

    pub fn sentiment_api_token(&self) -> Option<&str> {
        configured(self.sentiment.api_token.as_deref())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_positive_number("server.port", self.server.port as usize, 1)?;
        validate_positive_number("server.max_upload_bytes", self.server.max_upload_bytes, 1)?;

        validate_url("server.allowed_origin", &self.server.allowed_origin)?;
        if HeaderValue::from_str(&self.server.allowed_origin).is_err() {
            return Err(ServiceError::InvalidConfigValue {
                field: "server.allowed_origin".to_string(),
                value: self.server.allowed_origin.clone(),
                reason: "Not a valid header value".to_string(),
            });
        }

        validate_path("artifacts.dir", &self.artifacts.dir)?;

        // 未解析的 ${VAR} 視為未設定，不做 URL 檢查
        if let Some(endpoint) = self.image_classifier_endpoint() {
            validate_url("image_classifier.endpoint", endpoint)?;
            validate_range(
                "image_classifier.timeout_seconds",
                self.image_classifier.timeout_seconds,
                1,
                MAX_TIMEOUT_SECONDS,
            )?;
        }
        if let Some(endpoint) = self.sentiment_endpoint() {
            validate_url("sentiment.endpoint", endpoint)?;
            validate_range(
                "sentiment.timeout_seconds",
                self.sentiment.timeout_seconds,
                1,
                MAX_TIMEOUT_SECONDS,
            )?;
        }

        Ok(())
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
