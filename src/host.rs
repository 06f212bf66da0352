//! State store and history of the home automation host.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    core::{point::Point, series::ForecastSeries},
    prelude::*,
};

pub const UNKNOWN: &str = "unknown";
pub const UNAVAILABLE: &str = "unavailable";

/// Entity state as stored by the host: a state string and free-form attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    #[must_use]
    pub fn new(state: impl ToString) -> Self {
        Self { state: state.to_string(), attributes: Map::new() }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(UNAVAILABLE)
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.state.as_str(), "" | UNKNOWN | UNAVAILABLE)
    }

    /// Numeric state, where the sentinels and garbage read as no data.
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        if !self.is_available() {
            return None;
        }
        self.state.trim().parse::<f64>().ok().filter(|value| value.is_finite())
    }

    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)?.as_str()
    }

    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.attribute_str("unit_of_measurement")
    }

    /// Parse a forecast attribute of `[timestamp, value-or-null]` pairs.
    #[must_use]
    pub fn forecast(&self, key: &str) -> Option<ForecastSeries<f64>> {
        let value = self.attributes.get(key)?;
        match serde_json::from_value::<Vec<(DateTime<Utc>, Option<f64>)>>(value.clone()) {
            Ok(pairs) => Some(pairs.into_iter().map(Point::from).collect()),
            Err(error) => {
                debug!(key, "malformed forecast attribute: {error:#}");
                None
            }
        }
    }
}

/// Render a series as a forecast attribute of `[timestamp, value-or-null]` pairs.
#[must_use]
pub fn forecast_attribute<V: Serialize>(series: &[Point<V>]) -> Value {
    series
        .iter()
        .map(|point| {
            let value = serde_json::to_value(&point.value).unwrap_or(Value::Null);
            Value::Array(vec![Value::String(point.time.to_rfc3339()), value])
        })
        .collect()
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, entity_id: &str) -> Result<Option<EntityState>>;

    async fn set(&self, entity_id: &str, state: &EntityState) -> Result;
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Numeric samples of the entity in the time window, ordered by time.
    async fn history(
        &self,
        entity_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Point<f64>>>;
}

/// Both capabilities of the host, as needed by the sensors.
pub trait Host: StateStore + HistorySource {}

impl<T: StateStore + HistorySource> Host for T {}

/// In-process host used when no Home Assistant instance is configured.
#[derive(Default)]
pub struct MemoryStore {
    states: Mutex<HashMap<String, EntityState>>,
    history: Mutex<HashMap<String, Vec<Point<f64>>>>,
}

impl MemoryStore {
    #[cfg(test)]
    pub fn record(&self, entity_id: &str, point: Point<f64>) -> Result {
        self.history
            .lock()
            .map_err(|_| anyhow!("the history lock is poisoned"))?
            .entry(entity_id.to_owned())
            .or_default()
            .push(point);
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, entity_id: &str) -> Result<Option<EntityState>> {
        let states = self.states.lock().map_err(|_| anyhow!("the state lock is poisoned"))?;
        Ok(states.get(entity_id).cloned())
    }

    async fn set(&self, entity_id: &str, state: &EntityState) -> Result {
        trace!(entity_id, state = state.state, "setting…");
        self.states
            .lock()
            .map_err(|_| anyhow!("the state lock is poisoned"))?
            .insert(entity_id.to_owned(), state.clone());
        Ok(())
    }
}

#[async_trait]
impl HistorySource for MemoryStore {
    async fn history(
        &self,
        entity_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Point<f64>>> {
        let history = self.history.lock().map_err(|_| anyhow!("the history lock is poisoned"))?;
        let mut points: Vec<_> = history
            .get(entity_id)
            .into_iter()
            .flatten()
            .filter(|point| (since..=until).contains(&point.time) && point.value.is_finite())
            .copied()
            .collect();
        points.sort_by_key(|point| point.time);
        Ok(points)
    }
}
