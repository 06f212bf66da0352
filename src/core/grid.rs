//! The 15-minute sampling grid shared by every forecast series.

use chrono::{DateTime, DurationRound, TimeDelta, TimeZone, Utc};

use crate::core::{point::Point, series::ForecastSeries};

/// Sampling interval of all forecast series.
pub const INTERVAL: TimeDelta = TimeDelta::minutes(15);

/// Forecast horizon in points: 8 hours.
pub const N_POINTS: usize = 32;

/// First interval boundary at or after the instant, in UTC.
#[must_use]
pub fn first_boundary<Tz: TimeZone>(start: &DateTime<Tz>) -> DateTime<Utc> {
    let start = start.with_timezone(&Utc);
    match start.duration_trunc(INTERVAL) {
        Ok(floor) if floor == start => floor,
        Ok(floor) => floor + INTERVAL,
        // Truncation only fails for out-of-range instants, which cannot occur for real clocks.
        Err(_) => start,
    }
}

/// The [`N_POINTS`] grid instants starting from the [`first_boundary`].
pub fn instants<Tz: TimeZone>(start: &DateTime<Tz>) -> impl Iterator<Item = DateTime<Utc>> {
    let first = first_boundary(start);
    (0..N_POINTS).map(move |index| first + INTERVAL * i32::try_from(index).unwrap_or(i32::MAX))
}

/// Build a forecast series by evaluating the function at every grid instant.
pub fn sample<Tz, V>(
    start: &DateTime<Tz>,
    mut f: impl FnMut(DateTime<Utc>) -> Option<V>,
) -> ForecastSeries<V>
where
    Tz: TimeZone,
{
    instants(start).map(|time| Point::new(time, f(time))).collect()
}
