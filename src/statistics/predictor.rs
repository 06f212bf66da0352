//! Household consumption predictor.

use std::time::Instant;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use linfa::{Dataset, traits::Fit};
use linfa_elasticnet::ElasticNet;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    core::{grid, point::Point, series::ForecastSeries},
    prelude::*,
    statistics::features::{self, N_FEATURES},
};

/// L2 penalty, which keeps the fit well-posed with fewer samples than features.
const RIDGE_PENALTY: f64 = 0.1;

/// Fitted linear model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub intercept: f64,
    pub weights: Vec<f64>,
}

impl Coefficients {
    fn predict(&self, features: &[f64; N_FEATURES]) -> Option<f64> {
        if self.weights.len() != N_FEATURES {
            return None;
        }
        let value = self.intercept
            + self.weights.iter().zip(features).map(|(weight, feature)| weight * feature).sum::<f64>();
        value.is_finite().then_some(value)
    }

    fn is_finite(&self) -> bool {
        self.intercept.is_finite() && self.weights.iter().all(|weight| weight.is_finite())
    }
}

/// Persistent form of the predictor: the fitted model and the retained history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub model: Option<Coefficients>,

    #[serde(default)]
    pub history: Vec<Point<f64>>,
}

pub struct ConsumptionPredictor {
    model: Option<Coefficients>,

    /// Samples ordered by time.
    history: Vec<Point<f64>>,

    /// Samples older than this, relative to the latest one, are dropped.
    retention: TimeDelta,
}

impl ConsumptionPredictor {
    pub const DEFAULT_RETENTION: TimeDelta = TimeDelta::days(7);

    /// Train on the history, ignoring non-finite values.
    #[must_use]
    pub fn new(history: impl IntoIterator<Item = Point<f64>>, retention: TimeDelta) -> Self {
        let mut history: Vec<_> =
            history.into_iter().filter(|point| point.value.is_finite()).collect();
        history.sort_by_key(|point| point.time);
        let mut this = Self { model: None, history, retention };
        this.retain();
        this.fit();
        this
    }

    #[must_use]
    pub fn load(snapshot: Snapshot, retention: TimeDelta) -> Self {
        let mut this = Self { model: snapshot.model, history: snapshot.history, retention };
        this.history.retain(|point| point.value.is_finite());
        this.history.sort_by_key(|point| point.time);
        this.retain();
        this
    }

    #[must_use]
    pub fn dump(&self) -> Snapshot {
        Snapshot { model: self.model.clone(), history: self.history.clone() }
    }

    #[must_use]
    pub const fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    #[must_use]
    pub const fn n_samples(&self) -> usize {
        self.history.len()
    }

    /// Append the sample and refit on the whole retained history.
    pub fn add_and_refit(&mut self, at: DateTime<Utc>, value: f64) {
        if !value.is_finite() {
            warn!(%at, value, "ignored a non-finite sample");
            return;
        }
        let index = self.history.partition_point(|point| point.time <= at);
        self.history.insert(index, Point::new(at, value));
        self.retain();
        self.fit();
    }

    /// Predicted consumption at the instant, [`None`] until the model is fit.
    #[must_use]
    pub fn predict<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Option<f64> {
        let features = features::encode(&at.with_timezone(&Local));
        self.model.as_ref()?.predict(&features).map(f64::abs)
    }

    #[must_use]
    pub fn forecast<Tz: TimeZone>(&self, start: &DateTime<Tz>) -> ForecastSeries<f64> {
        grid::sample(start, |time| self.predict(&time))
    }

    fn retain(&mut self) {
        let Some(latest) = self.history.last().map(|point| point.time) else {
            return;
        };
        let since = latest - self.retention;
        let n_expired = self.history.partition_point(|point| point.time < since);
        if n_expired != 0 {
            self.history.drain(..n_expired);
            debug!(n_expired, "dropped the expired samples");
        }
    }

    /// Refit the model. On failure, the previous model stays in place.
    #[instrument(skip_all, fields(n_samples = self.history.len()))]
    fn fit(&mut self) {
        if self.history.is_empty() {
            return;
        }
        match self.try_fit() {
            Ok(model) => {
                self.model = Some(model);
            }
            Err(error) => {
                warn!("failed to fit the consumption model: {error:#}");
                if self.model.is_none() {
                    self.model = Some(self.mean_model());
                }
            }
        }
    }

    /// Intercept-only model predicting the mean of the history.
    #[expect(clippy::cast_precision_loss)]
    fn mean_model(&self) -> Coefficients {
        let sum: f64 = self.history.iter().map(|point| point.value).sum();
        Coefficients {
            intercept: sum / self.history.len() as f64,
            weights: vec![0.0; N_FEATURES],
        }
    }

    fn try_fit(&self) -> Result<Coefficients> {
        let records = Array2::from_shape_vec(
            (self.history.len(), N_FEATURES),
            self.history
                .iter()
                .flat_map(|point| features::encode(&point.time.with_timezone(&Local)))
                .collect(),
        )?;
        let targets: Array1<f64> = self.history.iter().map(|point| point.value).collect();
        let dataset = Dataset::new(records, targets);

        let start_time = Instant::now();
        let regression = ElasticNet::<f64>::params()
            .penalty(RIDGE_PENALTY)
            .l1_ratio(0.0)
            .fit(&dataset)
            .context("failed to fit a regression")?;
        debug!(elapsed = ?start_time.elapsed(), "regression has been fit");

        let model = Coefficients {
            intercept: regression.intercept(),
            weights: regression.hyperplane().to_vec(),
        };
        ensure!(model.is_finite(), "the regression diverged");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn samples() -> Vec<Point<f64>> {
        vec![
            Point::new(Utc.with_ymd_and_hms(2025, 5, 14, 10, 0, 0).unwrap(), 200.0),
            Point::new(Utc.with_ymd_and_hms(2025, 5, 14, 18, 0, 0).unwrap(), 500.0),
            Point::new(Utc.with_ymd_and_hms(2025, 5, 15, 10, 0, 0).unwrap(), 220.0),
            Point::new(Utc.with_ymd_and_hms(2025, 5, 15, 18, 0, 0).unwrap(), 480.0),
        ]
    }

    #[test]
    fn test_untrained() {
        let predictor = ConsumptionPredictor::new([], ConsumptionPredictor::DEFAULT_RETENTION);
        assert!(!predictor.is_trained());
        assert!(predictor.predict(&Utc::now()).is_none());
        let forecast = predictor.forecast(&Utc::now());
        assert_eq!(forecast.len(), grid::N_POINTS);
        assert!(forecast.iter().all(|point| point.value.is_none()));
    }

    #[test]
    fn test_non_finite_history_is_ignored() {
        let history = [Point::new(Utc::now(), f64::NAN), Point::new(Utc::now(), f64::INFINITY)];
        let predictor = ConsumptionPredictor::new(history, ConsumptionPredictor::DEFAULT_RETENTION);
        assert!(!predictor.is_trained());
        assert_eq!(predictor.n_samples(), 0);
    }

    #[test]
    fn test_forecast() {
        let predictor = ConsumptionPredictor::new(samples(), ConsumptionPredictor::DEFAULT_RETENTION);
        assert!(predictor.is_trained());
        let start = Utc.with_ymd_and_hms(2025, 5, 16, 9, 7, 0).unwrap();
        let forecast = predictor.forecast(&start);
        assert_eq!(forecast.len(), grid::N_POINTS);
        assert_eq!(forecast[0].time, Utc.with_ymd_and_hms(2025, 5, 16, 9, 15, 0).unwrap());
        for point in forecast {
            let value = point.value.unwrap();
            assert!(value.is_finite());
            assert!(value >= 0.0);
        }
    }

    #[test]
    fn test_add_and_refit() {
        let mut predictor = ConsumptionPredictor::new([], ConsumptionPredictor::DEFAULT_RETENTION);
        for point in samples() {
            predictor.add_and_refit(point.time, point.value);
        }
        predictor.add_and_refit(Utc.with_ymd_and_hms(2025, 5, 15, 19, 0, 0).unwrap(), f64::NAN);
        assert!(predictor.is_trained());
        assert_eq!(predictor.n_samples(), 4);
    }

    #[test]
    fn test_retention() {
        let mut predictor = ConsumptionPredictor::new(samples(), TimeDelta::hours(12));
        assert_eq!(predictor.n_samples(), 2);
        predictor.add_and_refit(Utc.with_ymd_and_hms(2025, 5, 16, 5, 0, 0).unwrap(), 210.0);
        assert_eq!(predictor.n_samples(), 2);
    }

    #[test]
    fn test_dump_load() -> Result {
        let predictor = ConsumptionPredictor::new(samples(), ConsumptionPredictor::DEFAULT_RETENTION);
        let serialized = toml::to_string(&predictor.dump())?;
        let restored = ConsumptionPredictor::load(
            toml::from_str(&serialized)?,
            ConsumptionPredictor::DEFAULT_RETENTION,
        );
        assert_eq!(restored.dump(), predictor.dump());

        let at = Utc.with_ymd_and_hms(2025, 5, 16, 18, 0, 0).unwrap();
        assert_abs_diff_eq!(
            restored.predict(&at).context("untrained")?,
            predictor.predict(&at).context("untrained")?,
            epsilon = 1e-6,
        );
        Ok(())
    }
}
