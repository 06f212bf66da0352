use chrono::{DateTime, Utc};

/// A time series point.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    derive_more::Constructor,
    serde::Deserialize,
    serde::Serialize,
)]
pub struct Point<V> {
    pub time: DateTime<Utc>,
    pub value: V,
}

impl<V> Point<V> {
    pub fn map<T>(self, f: impl FnOnce(V) -> T) -> Point<T> {
        Point::new(self.time, f(self.value))
    }
}

impl<V> From<(DateTime<Utc>, V)> for Point<V> {
    fn from((time, value): (DateTime<Utc>, V)) -> Self {
        Self::new(time, value)
    }
}
