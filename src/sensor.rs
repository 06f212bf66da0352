//! Entities published to the host, one tick function per entity.

pub mod consumer;
pub mod cost;
pub mod price;
pub mod synthetic;

pub const PRICE_ENTITY: &str = "sensor.tally_energy_price";
pub const CONSUMER_ENTITY: &str = "sensor.tally_consumer";
pub const COST_ENTITY: &str = "sensor.tally_total_cost";
pub const BLACK_HOLE_ENTITY: &str = "sensor.tally_black_hole";

/// Attribute holding a `[timestamp, value-or-null]` series.
pub const FORECAST_ATTRIBUTE: &str = "forecast";
