use std::{
    fmt::{Debug, Display, Formatter},
    ops::Mul,
};

use chrono::TimeDelta;

use crate::{
    prelude::*,
    quantity::{Quantity, energy::KilowattHours},
};

pub type Kilowatts = Quantity<1, 0, 0>;

impl Display for Kilowatts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} kW", self.0)
    }
}

impl Debug for Kilowatts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}kW", self.0)
    }
}

impl Mul<TimeDelta> for Kilowatts {
    type Output = KilowattHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity(self.0 * hours)
    }
}

/// Power normalised to watts, the unit every consumption reading is converted to.
#[derive(Copy, Clone, Default, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Watts(pub f64);

impl From<Watts> for Kilowatts {
    fn from(watts: Watts) -> Self {
        Self(watts.0 / 1000.0)
    }
}

impl Mul<TimeDelta> for Watts {
    type Output = KilowattHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        Kilowatts::from(self) * rhs
    }
}

impl Debug for Watts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}W", self.0)
    }
}

impl Display for Watts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} W", self.0)
    }
}

/// Power unit as reported by a consumption source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerUnit {
    Watt,
    Kilowatt,
    Megawatt,
}

impl PowerUnit {
    /// Parse the unit case-insensitively, so `mW` reads as megawatts.
    #[must_use]
    pub fn parse(unit: &str) -> Option<Self> {
        match unit.trim().to_lowercase().as_str() {
            "w" => Some(Self::Watt),
            "kw" => Some(Self::Kilowatt),
            "mw" => Some(Self::Megawatt),
            _ => None,
        }
    }

    #[must_use]
    pub const fn factor(self) -> f64 {
        match self {
            Self::Watt => 1.0,
            Self::Kilowatt => 1_000.0,
            Self::Megawatt => 1_000_000.0,
        }
    }

    /// Resolve the unit attribute of a reading. Unknown and missing units fall back to watts.
    pub fn resolve(unit: Option<&str>) -> Self {
        let unit = unit.unwrap_or_default();
        Self::parse(unit).unwrap_or_else(|| {
            warn!(unit, "unknown consumption unit, taking watts anyway");
            Self::Watt
        })
    }

    #[must_use]
    pub fn normalize(self, value: f64) -> Watts {
        Watts(value * self.factor())
    }
}
