use std::{
    fmt::{Debug, Display, Formatter},
    ops::Mul,
};

use crate::quantity::{Quantity, cost::Cost, energy::KilowattHours};

/// Currency per kilowatt-hour.
pub type KilowattHourRate = Quantity<-1, -1, 1>;

impl KilowattHourRate {
    /// Convert a wholesale price per megawatt-hour, rounded to 5 decimals.
    #[must_use]
    pub fn from_megawatt_hour_price(price: f64) -> Self {
        Self(((price / 1000.0) * 100_000.0).round() / 100_000.0)
    }
}

impl Display for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}/kWh", self.0)
    }
}

impl Debug for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}/kWh", self.0)
    }
}

impl Mul<KilowattHours> for KilowattHourRate {
    type Output = Cost;

    fn mul(self, rhs: KilowattHours) -> Self::Output {
        rhs * self
    }
}
