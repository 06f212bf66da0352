use chrono::{DateTime, Utc};

use crate::{
    core::{point::Point, reconciler::CostReconciler, series::ForecastSeries},
    host::{EntityState, StateStore, forecast_attribute},
    prelude::*,
    quantity::{Quantity, cost::Cost, power::PowerUnit, rate::KilowattHourRate},
    sensor::{CONSUMER_ENTITY, COST_ENTITY, FORECAST_ATTRIBUTE, PRICE_ENTITY},
};

/// Total electricity cost, accrued from the published price and consumption.
pub struct CostSensor {
    reconciler: CostReconciler,
}

impl CostSensor {
    pub const fn new(reconciler: CostReconciler) -> Self {
        Self { reconciler }
    }

    pub fn restore(value: Option<&toml::Value>) -> Self {
        Self::new(CostReconciler::restore(value))
    }

    #[must_use]
    pub const fn cumulative(&self) -> Cost {
        self.reconciler.cumulative()
    }

    #[instrument(skip_all)]
    pub async fn update(&mut self, store: &dyn StateStore, now: DateTime<Utc>) -> Result<EntityState> {
        let price_state = store.get(PRICE_ENTITY).await?.unwrap_or_else(EntityState::unavailable);
        let consumer_state =
            store.get(CONSUMER_ENTITY).await?.unwrap_or_else(EntityState::unavailable);

        let price = price_state.numeric_value().map(KilowattHourRate::from);
        let price_forecast: Option<Vec<Point<Option<KilowattHourRate>>>> =
            available_forecast(&price_state).map(|series| {
                series.into_iter().map(|point| point.map(|value| value.map(Quantity))).collect()
            });

        let reading = consumer_state.numeric_value();
        let reading_forecast = available_forecast(&consumer_state);
        let unit = if reading.is_some() || reading_forecast.is_some() {
            PowerUnit::resolve(consumer_state.unit())
        } else {
            PowerUnit::Watt
        };
        let consumption = reading.map(|value| unit.normalize(value));
        let consumption_forecast: Option<Vec<_>> = reading_forecast.map(|series| {
            series
                .into_iter()
                .map(|point| point.map(|value| value.map(|value| unit.normalize(value))))
                .collect()
        });

        let cost = self.reconciler.update(now, price, consumption);
        let cost_forecast = CostReconciler::forecast_cumulative(
            price_forecast.as_deref(),
            consumption_forecast.as_deref(),
        )
        .map(|series| series.into_iter().map(|point| point.map(|cost| cost.0)).collect::<Vec<_>>());
        info!(
            ?cost,
            cumulative = ?self.cumulative(),
            last_update = ?self.reconciler.last_update(),
            "updated",
        );

        let mut state = EntityState::new(self.cumulative().0)
            .with_attribute("device_class", "monetary")
            .with_attribute("state_class", "total")
            .with_attribute("current_price", price.map(|price| price.0))
            .with_attribute("current_consumption", consumption.map(|consumption| consumption.0))
            .with_attribute(
                "cost_forecast_cumulative",
                cost_forecast.map(|series| forecast_attribute(&series)),
            );
        if let Some(currency) = currency_of(&price_state) {
            state = state.with_attribute("unit_of_measurement", currency);
        }
        store.set(COST_ENTITY, &state).await?;
        Ok(state)
    }
}

/// Forecast attribute of an entity, where an unavailable entity has none.
fn available_forecast(state: &EntityState) -> Option<ForecastSeries<f64>> {
    if state.is_available() { state.forecast(FORECAST_ATTRIBUTE) } else { None }
}

/// Currency of a price entity, from its `<currency>/kWh` unit.
fn currency_of(price_state: &EntityState) -> Option<&str> {
    price_state.unit()?.split_once('/').map(|(currency, _)| currency)
}
