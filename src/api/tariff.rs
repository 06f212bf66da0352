//! Slovenian retail tariffs: a single flat rate or a high/low time-of-use pair.

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Europe::Ljubljana;

use crate::{api::price_oracle::PriceOracle, core::calendar, quantity::rate::KilowattHourRate};

/// Published rates of one supplier.
#[derive(Copy, Clone, Debug)]
pub struct Rates {
    pub single: KilowattHourRate,
    pub high: KilowattHourRate,
    pub low: KilowattHourRate,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Scheme {
    /// «Enotarifno»: the same rate around the clock.
    Single,

    /// «Dvotarifno»: high rate on working days from 6:00 till 22:00, low rate otherwise.
    Dual,
}

/// The high rate applies on Slovenian working days between 6:00 and 22:00 local time.
#[must_use]
pub fn is_high_rate(at: DateTime<Utc>) -> bool {
    let local = at.with_timezone(&Ljubljana);
    (6..22).contains(&local.hour()) && calendar::is_working_day(local.date_naive())
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Tariff {
    rates: Rates,
    scheme: Scheme,
}

impl Tariff {
    pub const fn new(rates: Rates, scheme: Scheme) -> Self {
        Self { rates, scheme }
    }

    #[must_use]
    pub fn rate_at(&self, at: DateTime<Utc>) -> KilowattHourRate {
        match self.scheme {
            Scheme::Single => self.rates.single,
            Scheme::Dual if is_high_rate(at) => self.rates.high,
            Scheme::Dual => self.rates.low,
        }
    }
}

#[async_trait]
impl PriceOracle for Tariff {
    fn currency(&self) -> &str {
        "EUR"
    }

    async fn price(&mut self, at: DateTime<Utc>) -> Option<KilowattHourRate> {
        Some(self.rate_at(at))
    }
}
