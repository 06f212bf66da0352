use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    host::{EntityState, HistorySource, StateStore, forecast_attribute},
    prelude::*,
    sensor::{CONSUMER_ENTITY, FORECAST_ATTRIBUTE},
    statistics::predictor::{ConsumptionPredictor, Snapshot},
};

/// Attributes mirrored from the bound consumption entity.
const MIRRORED_ATTRIBUTES: [&str; 4] = ["unit_of_measurement", "device_class", "state_class", "icon"];

/// Live consumption of the bound entity, with the predicted consumption.
pub struct ConsumerSensor {
    source: Option<String>,
    predictor: ConsumptionPredictor,
}

impl ConsumerSensor {
    /// History the predictor is seeded with.
    pub const SEED_WINDOW: TimeDelta = TimeDelta::days(7);

    pub const fn new(source: Option<String>, predictor: ConsumptionPredictor) -> Self {
        Self { source, predictor }
    }

    /// Restore the persisted predictor, or seed a new one from the source history.
    #[instrument(skip_all, fields(source = source.as_deref()))]
    pub async fn seed(
        source: Option<String>,
        history: &dyn HistorySource,
        snapshot: Option<Snapshot>,
        retention: TimeDelta,
        now: DateTime<Utc>,
    ) -> Self {
        if let Some(snapshot) = snapshot {
            info!(n_samples = snapshot.history.len(), "restored the predictor");
            return Self::new(source, ConsumptionPredictor::load(snapshot, retention));
        }
        let points = match source.as_deref() {
            Some(entity_id) => history
                .history(entity_id, now - Self::SEED_WINDOW, now)
                .await
                .inspect_err(|error| warn!("failed to fetch the history: {error:#}"))
                .unwrap_or_default(),
            None => Vec::new(),
        };
        info!(n_samples = points.len(), "seeding the predictor…");
        let predictor = ConsumptionPredictor::new(points, retention);
        info!(is_trained = predictor.is_trained(), "seeded");
        Self::new(source, predictor)
    }

    #[must_use]
    pub const fn predictor(&self) -> &ConsumptionPredictor {
        &self.predictor
    }

    #[instrument(skip_all, fields(source = self.source.as_deref()))]
    pub async fn update(&mut self, store: &dyn StateStore, now: DateTime<Utc>) -> Result<EntityState> {
        let source_state = match self.source.as_deref() {
            Some(entity_id) => store.get(entity_id).await?,
            None => None,
        };
        let Some((source_state, value)) =
            source_state.and_then(|state| state.numeric_value().map(|value| (state, value)))
        else {
            info!("no consumption reading");
            let state = EntityState::unavailable();
            store.set(CONSUMER_ENTITY, &state).await?;
            return Ok(state);
        };

        self.predictor.add_and_refit(now, value);
        let forecast = self.predictor.forecast(&now);
        info!(value, n_samples = self.predictor.n_samples(), "refit");

        let mut state = EntityState::new(value);
        for key in MIRRORED_ATTRIBUTES {
            if let Some(attribute) = source_state.attributes.get(key) {
                state.attributes.insert(key.to_owned(), attribute.clone());
            }
        }
        let state = state.with_attribute(FORECAST_ATTRIBUTE, forecast_attribute(&forecast));
        store.set(CONSUMER_ENTITY, &state).await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{core::point::Point, host::MemoryStore};

    const SOURCE: &str = "sensor.power_consumption";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 16, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_seed_from_history() -> Result {
        let store = MemoryStore::default();
        store.record(SOURCE, Point::new(now() - TimeDelta::days(2), 200.0))?;
        store.record(SOURCE, Point::new(now() - TimeDelta::days(1), 500.0))?;
        store.record(SOURCE, Point::new(now() - TimeDelta::days(8), 900.0))?;
        let sensor = ConsumerSensor::seed(
            Some(SOURCE.to_owned()),
            &store,
            None,
            ConsumptionPredictor::DEFAULT_RETENTION,
            now(),
        )
        .await;
        assert_eq!(sensor.predictor().n_samples(), 2);
        assert!(sensor.predictor().is_trained());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_mirrors_source() -> Result {
        let store = MemoryStore::default();
        let source = EntityState::new("1.3")
            .with_attribute("unit_of_measurement", "kW")
            .with_attribute("device_class", "power")
            .with_attribute("friendly_name", "Power consumption");
        store.set(SOURCE, &source).await?;
        let mut sensor = ConsumerSensor::seed(
            Some(SOURCE.to_owned()),
            &store,
            None,
            ConsumptionPredictor::DEFAULT_RETENTION,
            now(),
        )
        .await;

        sensor.update(&store, now()).await?;
        let state = store.get(CONSUMER_ENTITY).await?.context("not published")?;
        assert_eq!(state.numeric_value(), Some(1.3));
        assert_eq!(state.unit(), Some("kW"));
        assert_eq!(state.attribute_str("device_class"), Some("power"));
        assert_eq!(state.attribute_str("friendly_name"), None);
        let forecast = state.forecast(FORECAST_ATTRIBUTE).context("no forecast")?;
        assert_eq!(forecast.len(), 32);
        assert!(forecast.iter().all(|point| point.value.is_some_and(|value| value >= 0.0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unavailable_source() -> Result {
        let store = MemoryStore::default();
        store.set(SOURCE, &EntityState::unavailable()).await?;
        let mut sensor = ConsumerSensor::new(
            Some(SOURCE.to_owned()),
            ConsumptionPredictor::new([], ConsumptionPredictor::DEFAULT_RETENTION),
        );
        let state = sensor.update(&store, now()).await?;
        assert!(!state.is_available());
        assert_eq!(sensor.predictor().n_samples(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unbound() -> Result {
        let store = MemoryStore::default();
        let mut sensor = ConsumerSensor::new(
            None,
            ConsumptionPredictor::new([], ConsumptionPredictor::DEFAULT_RETENTION),
        );
        assert!(!sensor.update(&store, now()).await?.is_available());
        Ok(())
    }
}
