//! Realized and forecast electricity cost from prices and consumption.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::{
    core::{grid, point::Point, series::Series},
    prelude::*,
    quantity::{cost::Cost, power::Watts, rate::KilowattHourRate},
};

#[must_use]
#[derive(Copy, Clone, Debug, Default)]
pub struct CostReconciler {
    /// Running total since the counter was started. Never reset automatically.
    cumulative: Cost,

    /// Baseline for the next accrual, unset until the first complete reading.
    last_update: Option<DateTime<Utc>>,
}

impl CostReconciler {
    pub const fn new(cumulative: Cost) -> Self {
        Self { cumulative, last_update: None }
    }

    /// Restore the counter from a persisted value, falling back to zero on garbage.
    #[expect(clippy::cast_precision_loss)]
    pub fn restore(value: Option<&toml::Value>) -> Self {
        let cumulative = match value {
            None => Some(0.0),
            Some(toml::Value::Float(value)) => Some(*value),
            Some(toml::Value::Integer(value)) => Some(*value as f64),
            Some(toml::Value::String(value)) => value.trim().parse().ok(),
            Some(_) => None,
        };
        let cumulative = cumulative.filter(|cumulative: &f64| cumulative.is_finite()).unwrap_or_else(|| {
            warn!(?value, "the persisted cumulative cost is not a number, starting from zero");
            0.0
        });
        Self::new(Cost::from(cumulative))
    }

    #[must_use]
    pub const fn cumulative(&self) -> Cost {
        self.cumulative
    }

    #[must_use]
    pub const fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Accrue the cost since the previous update.
    ///
    /// Returns the cost of this tick, or [`None`] when either reading is missing,
    /// in which case neither the total nor the baseline moves.
    /// The very first complete reading only records the baseline and costs nothing.
    #[instrument(skip_all, fields(now = %now))]
    pub fn update(
        &mut self,
        now: DateTime<Utc>,
        price: Option<KilowattHourRate>,
        consumption: Option<Watts>,
    ) -> Option<Cost> {
        let (Some(price), Some(consumption)) = (price, consumption) else {
            info!(?price, ?consumption, "incomplete reading, skipped");
            return None;
        };
        let cost = match self.last_update {
            None => {
                info!("recorded the baseline");
                Cost::ZERO
            }
            Some(last_update) => price * (consumption * (now - last_update)),
        };
        self.cumulative += cost;
        self.last_update = Some(now);
        debug!(?cost, cumulative = ?self.cumulative, "updated");
        Some(cost)
    }

    /// Project the cumulative cost over the forecast horizon.
    ///
    /// The series must start within one interval from each other, otherwise they cannot
    /// be reconciled. Pairs with a missing value are skipped, so the resulting curve
    /// is anchored at the consumption timestamps and may have gaps.
    #[must_use]
    pub fn forecast_cumulative(
        prices: Option<&[Point<Option<KilowattHourRate>>]>,
        consumption: Option<&[Point<Option<Watts>>]>,
    ) -> Option<Series<Cost>> {
        let (mut prices, mut consumption) = (prices?, consumption?);
        let (first_price, first_consumption) = (prices.first()?, consumption.first()?);
        let offset = (first_price.time - first_consumption.time).abs();
        if offset > grid::INTERVAL {
            warn!(
                price_start = %first_price.time,
                consumption_start = %first_consumption.time,
                "the forecasts are too far apart",
            );
            return None;
        }
        match first_price.time.cmp(&first_consumption.time) {
            Ordering::Less => prices = &prices[1..],
            Ordering::Greater => consumption = &consumption[1..],
            Ordering::Equal => {}
        }

        let mut total = Cost::ZERO;
        let mut last_time: Option<DateTime<Utc>> = None;
        let mut series = Series::with_capacity(consumption.len());
        for (price, power) in prices.iter().zip(consumption) {
            let (Some(rate), Some(watts)) = (price.value, power.value) else {
                continue;
            };
            if let Some(last_time) = last_time {
                total += rate * (watts * (power.time - last_time));
            }
            last_time = Some(power.time);
            series.push(Point::new(power.time, total));
        }
        Some(series)
    }
}
