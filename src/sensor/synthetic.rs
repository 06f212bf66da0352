//! The «black hole»: a simulated household load for trying things out without a meter.

use std::f64::consts::TAU;

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};

use crate::{
    host::{EntityState, StateStore},
    prelude::*,
    quantity::power::Watts,
    sensor::BLACK_HOLE_ENTITY,
};

const BASE_LOAD: f64 = 300.0;

/// Peak center hour, amplitude in watts, and width in hours.
const PEAKS: [(f64, f64, f64); 3] = [(2.0, 12000.0, 2.5), (6.0, 5400.0, 2.0), (18.0, 7200.0, 3.0)];

/// Simulated consumption at the instant in its own timezone.
#[must_use]
pub fn power_at<Tz: TimeZone>(at: &DateTime<Tz>) -> Watts {
    let minute_of_day = f64::from(at.hour() * 60 + at.minute());
    let hour = minute_of_day / 60.0;
    let peaks: f64 = PEAKS
        .iter()
        .map(|(center, amplitude, width)| {
            let delta = (hour - center + 12.0).rem_euclid(24.0) - 12.0;
            amplitude * (-delta.powi(2) / (2.0 * width.powi(2))).exp()
        })
        .sum();
    let modulation = 150.0 * (TAU * hour / 24.0).cos();
    let ripple = 2.0 * (TAU * minute_of_day / 7.5).sin()
        + 1.5 * (TAU * minute_of_day / 3.3).sin()
        + 0.8 * (TAU * minute_of_day / 1.8).sin();
    Watts(BASE_LOAD + peaks + modulation + ripple)
}

#[instrument(skip_all)]
pub async fn update(store: &dyn StateStore, now: DateTime<Utc>) -> Result<EntityState> {
    let power = power_at(&now.with_timezone(&Local));
    debug!(?power, "simulated");
    let state = EntityState::new(power.0)
        .with_attribute("unit_of_measurement", "W")
        .with_attribute("device_class", "power")
        .with_attribute("state_class", "measurement")
        .with_attribute("icon", "mdi:lightning-bolt");
    store.set(BLACK_HOLE_ENTITY, &state).await?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_night_peak() {
        let power = power_at(&Utc.with_ymd_and_hms(2025, 5, 14, 2, 0, 0).unwrap());
        // Base, the full night peak, a bit of the morning peak, and the modulation.
        let morning = 5400.0 * (-16.0_f64 / 8.0).exp();
        let evening = 7200.0 * (-64.0_f64 / 18.0).exp();
        let modulation = 150.0 * (TAU / 12.0).cos();
        let ripple =
            2.0 * (TAU * 120.0 / 7.5).sin() + 1.5 * (TAU * 120.0 / 3.3).sin() + 0.8 * (TAU * 120.0 / 1.8).sin();
        assert_abs_diff_eq!(
            power.0,
            300.0 + 12000.0 + morning + evening + modulation + ripple,
            epsilon = 1e-9,
        );
    }

    #[test]
    fn test_always_positive() {
        for hour in 0..24 {
            for minute in [0, 15, 30, 45] {
                let at = Utc.with_ymd_and_hms(2025, 5, 14, hour, minute, 0).unwrap();
                assert!(power_at(&at).0 > 0.0);
            }
        }
    }
}
