use crate::domain::model::{ForecastRow, ImagePrediction, ImageTensor, SentimentResult};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Uniform "given features, return prediction" contract over every
/// externally supplied model.
#[async_trait]
pub trait Predictor: Send + Sync {
    type Input: ?Sized + Sync;
    type Output: Send;

    async fn predict(&self, input: &Self::Input) -> Result<Self::Output>;
}

/// Top-3 labels for a preprocessed image, highest confidence first.
pub type ImageClassifier = dyn Predictor<Input = ImageTensor, Output = Vec<ImagePrediction>>;

/// Input is the horizon in days; output is exactly that many future rows.
pub type Forecaster = dyn Predictor<Input = u32, Output = Vec<ForecastRow>>;

pub type Regressor = dyn Predictor<Input = [f64], Output = f64>;

pub type SentimentClassifier = dyn Predictor<Input = str, Output = SentimentResult>;

/// Categorical label → integer code mapping with a queryable valid set.
pub trait CategoryEncoder: Send + Sync {
    fn classes(&self) -> &[String];

    fn encode(&self, label: &str) -> Option<i64>;
}
