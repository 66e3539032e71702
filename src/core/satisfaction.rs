//! Satisfaction score: 60% normalized rating, 40% comment sentiment.

use crate::domain::model::{SentimentLabel, SentimentResult};
use crate::domain::ports::SentimentClassifier;
use crate::utils::error::{Result, ServiceError};
use std::sync::Arc;

pub const RATING_WEIGHT: f64 = 0.6;
pub const SENTIMENT_WEIGHT: f64 = 0.4;
pub const NEUTRAL_SENTIMENT: f64 = 50.0;

/// Maps a rating in [1, 5] onto [0, 100].
pub fn normalize_rating(rating: f64) -> f64 {
    ((rating - 1.0) / 4.0) * 100.0
}

/// Positive confidence counts up, negative confidence counts down.
pub fn sentiment_score(result: &SentimentResult) -> Result<f64> {
    if !(0.0..=1.0).contains(&result.score) {
        return Err(ServiceError::prediction(
            "Sentiment analysis returned an invalid score",
            result.score,
        ));
    }

    Ok(match result.label {
        SentimentLabel::Positive => result.score * 100.0,
        SentimentLabel::Negative => (1.0 - result.score) * 100.0,
    })
}

/// Rounds half to even, clamped to [0, 100].
pub fn combine(normalized_rating: f64, sentiment: f64) -> u8 {
    let weighted = RATING_WEIGHT * normalized_rating + SENTIMENT_WEIGHT * sentiment;
    weighted.clamp(0.0, 100.0).round_ties_even() as u8
}

pub fn rating_only(rating: f64) -> u8 {
    normalize_rating(rating).clamp(0.0, 100.0).round_ties_even() as u8
}

#[derive(Clone, Default)]
pub struct SatisfactionScorer {
    classifier: Option<Arc<SentimentClassifier>>,
}

impl SatisfactionScorer {
    pub fn new(classifier: Option<Arc<SentimentClassifier>>) -> Self {
        Self { classifier }
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Never fails: without a classifier the sentiment is neutral, and a
    /// classifier failure degrades to the rating alone.
    pub async fn score(&self, rating: f64, comment: &str) -> u8 {
        let normalized = normalize_rating(rating);

        let Some(classifier) = &self.classifier else {
            return combine(normalized, NEUTRAL_SENTIMENT);
        };

        let sentiment = match classifier.predict(comment).await {
            Ok(result) => sentiment_score(&result),
            Err(e) => Err(e),
        };

        match sentiment {
            Ok(sentiment) => {
                tracing::debug!(rating, sentiment, "Combined rating and sentiment");
                combine(normalized, sentiment)
            }
            Err(e) => {
                tracing::error!(
                    stage = "sentiment",
                    error = %e,
                    "Error computing satisfaction score, falling back to rating only"
                );
                rating_only(rating)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Predictor;
    use async_trait::async_trait;

    struct FixedSentiment(SentimentResult);

    #[async_trait]
    impl Predictor for FixedSentiment {
        type Input = str;
        type Output = SentimentResult;

        async fn predict(&self, _input: &str) -> Result<SentimentResult> {
            Ok(self.0)
        }
    }

    struct BrokenSentiment;

    #[async_trait]
    impl Predictor for BrokenSentiment {
        type Input = str;
        type Output = SentimentResult;

        async fn predict(&self, _input: &str) -> Result<SentimentResult> {
            Err(ServiceError::prediction("Sentiment analysis failed", "timeout"))
        }
    }

    fn scorer_with(result: SentimentResult) -> SatisfactionScorer {
        SatisfactionScorer::new(Some(Arc::new(FixedSentiment(result))))
    }

    #[tokio::test]
    async fn test_neutral_default_without_classifier() {
        let scorer = SatisfactionScorer::default();
        assert_eq!(scorer.score(1.0, "meh").await, 20);
        assert_eq!(scorer.score(5.0, "great").await, 80);
        assert_eq!(scorer.score(3.0, "ok").await, 50);
    }

    #[tokio::test]
    async fn test_positive_sentiment_maxes_out() {
        let scorer = scorer_with(SentimentResult {
            label: SentimentLabel::Positive,
            score: 1.0,
        });
        assert_eq!(scorer.score(5.0, "loved it").await, 100);
    }

    #[tokio::test]
    async fn test_negative_sentiment_inverts_confidence() {
        let scorer = scorer_with(SentimentResult {
            label: SentimentLabel::Negative,
            score: 0.9,
        });
        // 0.6 * 50 + 0.4 * 10
        assert_eq!(scorer.score(3.0, "cold food").await, 34);
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_back_to_rating() {
        let scorer = SatisfactionScorer::new(Some(Arc::new(BrokenSentiment)));
        for rating in [1.0, 2.0, 3.0, 4.0, 5.0, 1.5] {
            assert_eq!(scorer.score(rating, "x").await, rating_only(rating));
        }
        assert_eq!(scorer.score(4.0, "x").await, 75);
    }

    #[tokio::test]
    async fn test_out_of_range_sentiment_score_falls_back() {
        let scorer = scorer_with(SentimentResult {
            label: SentimentLabel::Positive,
            score: 1.7,
        });
        assert_eq!(scorer.score(2.0, "x").await, 25);
    }

    #[tokio::test]
    async fn test_score_is_bounded() {
        for label in [SentimentLabel::Positive, SentimentLabel::Negative] {
            for score in [0.0, 0.25, 0.5, 0.99, 1.0] {
                let scorer = scorer_with(SentimentResult { label, score });
                for rating in [1.0, 1.3, 2.0, 2.5, 3.7, 4.0, 5.0] {
                    let value = scorer.score(rating, "comment").await;
                    assert!(value <= 100);
                }
            }
        }
    }

    #[test]
    fn test_rounding_is_half_to_even() {
        // rating 1.5 → 12.5
        assert_eq!(rating_only(1.5), 12);
        assert_eq!(combine(0.0, 50.0), 20);
    }
}
