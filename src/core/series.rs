use crate::core::point::Point;

pub type Series<V> = Vec<Point<V>>;

/// Fixed-length series on the sampling grid where any value may be absent.
pub type ForecastSeries<V> = Series<Option<V>>;
