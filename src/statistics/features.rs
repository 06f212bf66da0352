//! Calendar features of an instant for the consumption regression.

use std::f64::consts::TAU;

use chrono::{DateTime, Datelike, TimeZone, Timelike};

pub const N_FEATURES: usize = 15;

/// Encode the instant in its own timezone.
///
/// Hour, minute, month and ISO week are encoded both linearly and cyclically,
/// so that the periodicity of a day, week and year can be picked up by a linear model.
#[must_use]
pub fn encode<Tz: TimeZone>(at: &DateTime<Tz>) -> [f64; N_FEATURES] {
    let hour = f64::from(at.hour());
    let minute = f64::from(at.minute());
    let minute_of_day = hour * 60.0 + minute;
    let weekday = at.weekday().num_days_from_monday();
    let month = f64::from(at.month());
    let week = f64::from(at.iso_week().week());
    [
        hour + minute / 60.0,
        f64::from(weekday),
        if weekday >= 5 { 1.0 } else { 0.0 },
        (TAU * hour / 24.0).sin(),
        (TAU * hour / 24.0).cos(),
        (TAU * minute / 60.0).sin(),
        (TAU * minute / 60.0).cos(),
        (TAU * minute_of_day / 1440.0).sin(),
        (TAU * minute_of_day / 1440.0).cos(),
        month,
        week,
        (TAU * month / 12.0).sin(),
        (TAU * month / 12.0).cos(),
        (TAU * week / 52.0).sin(),
        (TAU * week / 52.0).cos(),
    ]
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_encode_saturday_evening() {
        // Saturday, ISO week 20.
        let features = encode(&Utc.with_ymd_and_hms(2025, 5, 17, 18, 30, 0).unwrap());
        assert_abs_diff_eq!(features[0], 18.5);
        assert_abs_diff_eq!(features[1], 5.0);
        assert_abs_diff_eq!(features[2], 1.0);
        assert_abs_diff_eq!(features[3], -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(features[6], -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(features[9], 5.0);
        assert_abs_diff_eq!(features[10], 20.0);
    }

    #[test]
    fn test_encode_midnight() {
        let features = encode(&Utc.with_ymd_and_hms(2025, 5, 14, 0, 0, 0).unwrap());
        assert_abs_diff_eq!(features[0], 0.0);
        assert_abs_diff_eq!(features[2], 0.0);
        assert_abs_diff_eq!(features[7], 0.0);
        assert_abs_diff_eq!(features[8], 1.0);
    }
}
