use crate::domain::model::{SentimentLabel, SentimentResult};
use crate::domain::ports::Predictor;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScoredLabel {
    label: String,
    score: f64,
}

/// Hosted text-classification endpoints answer either one list per input or
/// a single flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Batched(Vec<Vec<ScoredLabel>>),
    Flat(Vec<ScoredLabel>),
}

impl ClassifyResponse {
    fn into_labels(self) -> Vec<ScoredLabel> {
        match self {
            Self::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
            Self::Flat(labels) => labels,
        }
    }
}

/// Sentiment classifier served over HTTP.
pub struct RemoteSentimentClassifier {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl RemoteSentimentClassifier {
    pub fn new(endpoint: String, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_token,
        })
    }

    async fn classify(&self, text: &str) -> Result<SentimentResult> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { inputs: text });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("Requesting sentiment from: {}", self.endpoint);
        let response = request.send().await?.error_for_status()?;
        let labels = response.json::<ClassifyResponse>().await?.into_labels();

        let best = labels
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| ServiceError::prediction("Sentiment analysis failed", "empty response"))?;

        let label = SentimentLabel::parse(&best.label).ok_or_else(|| {
            ServiceError::prediction(
                "Sentiment analysis failed",
                format!("unexpected label: {}", best.label),
            )
        })?;

        Ok(SentimentResult {
            label,
            score: best.score,
        })
    }
}

#[async_trait]
impl Predictor for RemoteSentimentClassifier {
    type Input = str;
    type Output = SentimentResult;

    async fn predict(&self, input: &str) -> Result<SentimentResult> {
        self.classify(input).await.map_err(|e| match e {
            ServiceError::Prediction { .. } => e,
            other => ServiceError::prediction("Sentiment analysis failed", other),
        })
    }
}
