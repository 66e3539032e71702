//! Additive trend forecaster: piecewise-linear trend plus Fourier
//! seasonalities, evaluated from exported parameters.
//!
//! Every call projects the whole history plus `horizon` daily periods and
//! keeps the last `horizon` rows; nothing is cached between calls.

use crate::adapters::read_artifact;
use crate::domain::model::ForecastRow;
use crate::domain::ports::Predictor;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;
use std::f64::consts::PI;
use std::path::Path;

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, Deserialize)]
pub struct Changepoint {
    /// Position in scaled history time, 0 = first day, 1 = last day.
    pub t: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trend {
    pub k: f64,
    pub m: f64,
    #[serde(default)]
    pub changepoints: Vec<Changepoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Seasonality {
    #[serde(default)]
    pub name: String,
    /// Period in days.
    pub period: f64,
    /// `[sin_1, cos_1, sin_2, cos_2, ...]`
    pub coefficients: Vec<f64>,
}

fn default_interval_width() -> f64 {
    0.8
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendForecaster {
    history_start: NaiveDate,
    history_end: NaiveDate,
    y_scale: f64,
    trend: Trend,
    #[serde(default)]
    seasonalities: Vec<Seasonality>,
    #[serde(default)]
    sigma: f64,
    #[serde(default = "default_interval_width")]
    interval_width: f64,
}

impl TrendForecaster {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_artifact(path.as_ref(), Self::from_json_str)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(content)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| ServiceError::artifact("trend forecaster", message);

        if self.history_end <= self.history_start {
            return Err(invalid("history_end must be after history_start".to_string()));
        }
        if !self.y_scale.is_finite() || !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(invalid("y_scale and sigma must be finite, sigma non-negative".to_string()));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(invalid(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        for season in &self.seasonalities {
            if season.period <= 0.0 || season.coefficients.len() % 2 != 0 {
                return Err(invalid(format!(
                    "seasonality '{}' needs a positive period and sin/cos coefficient pairs",
                    season.name
                )));
            }
        }
        Ok(())
    }

    fn history_span_days(&self) -> f64 {
        (self.history_end - self.history_start).num_days() as f64
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.history_start).num_days() as f64 / self.history_span_days()
    }

    fn trend_at(&self, t: f64) -> f64 {
        let mut rate = self.trend.k;
        let mut offset = self.trend.m;
        for cp in self.trend.changepoints.iter().filter(|cp| t >= cp.t) {
            rate += cp.delta;
            offset -= cp.t * cp.delta;
        }
        rate * t + offset
    }

    fn seasonal_at(&self, date: NaiveDate) -> f64 {
        let day = (date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE) as f64;
        self.seasonalities
            .iter()
            .map(|season| {
                season
                    .coefficients
                    .chunks_exact(2)
                    .enumerate()
                    .map(|(i, pair)| {
                        let angle = 2.0 * PI * (i + 1) as f64 * day / season.period;
                        pair[0] * angle.sin() + pair[1] * angle.cos()
                    })
                    .sum::<f64>()
            })
            .sum()
    }

    /// Mean absolute rate change, used as the trend uncertainty beyond history.
    fn trend_sigma(&self) -> f64 {
        let cps = &self.trend.changepoints;
        if cps.is_empty() {
            0.0
        } else {
            cps.iter().map(|cp| cp.delta.abs()).sum::<f64>() / cps.len() as f64
        }
    }

    fn row(&self, date: NaiveDate, z: f64, trend_sigma: f64) -> ForecastRow {
        let t = self.scaled_time(date);
        let yhat = (self.trend_at(t) + self.seasonal_at(date)) * self.y_scale;

        let beyond = (t - 1.0).max(0.0);
        let spread = (self.sigma.powi(2) + (trend_sigma * beyond).powi(2)).sqrt();
        let half_width = z * spread * self.y_scale.abs();

        ForecastRow {
            ds: date.format("%Y-%m-%d").to_string(),
            yhat,
            yhat_lower: yhat - half_width,
            yhat_upper: yhat + half_width,
        }
    }

    pub fn forecast(&self, horizon: u32) -> Result<Vec<ForecastRow>> {
        let last = self
            .history_end
            .checked_add_days(Days::new(horizon as u64))
            .ok_or_else(|| {
                ServiceError::prediction("Forecast projection failed", "horizon exceeds date range")
            })?;

        let z = normal_quantile((1.0 + self.interval_width) / 2.0);
        let trend_sigma = self.trend_sigma();

        let projection: Vec<ForecastRow> = self
            .history_start
            .iter_days()
            .take_while(|date| *date <= last)
            .map(|date| self.row(date, z, trend_sigma))
            .collect();

        let keep = projection.len().saturating_sub(horizon as usize);
        Ok(projection.into_iter().skip(keep).collect())
    }
}

#[async_trait]
impl Predictor for TrendForecaster {
    type Input = u32;
    type Output = Vec<ForecastRow>;

    async fn predict(&self, horizon: &u32) -> Result<Vec<ForecastRow>> {
        self.forecast(*horizon)
    }
}

/// Standard normal quantile for p in (0.5, 1), rational approximation with
/// absolute error below 4.5e-4.
fn normal_quantile(p: f64) -> f64 {
    let t = (-2.0 * (1.0 - p).ln()).sqrt();
    let numerator = 2.515_517 + 0.802_853 * t + 0.010_328 * t * t;
    let denominator = 1.0 + 1.432_788 * t + 0.189_269 * t * t + 0.001_308 * t * t * t;
    t - numerator / denominator
}
