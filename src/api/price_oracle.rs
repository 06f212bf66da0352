use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    core::{grid, point::Point, series::ForecastSeries},
    quantity::rate::KilowattHourRate,
};

/// Electricity price source for one provider.
///
/// Implementations never fail on missing data: an unpublished day, a failed fetch, or a malformed
/// payload all read as an absent price.
#[async_trait]
pub trait PriceOracle: Send {
    /// ISO 4217 code of the prices.
    fn currency(&self) -> &str;

    /// Price of electricity at the instant.
    async fn price(&mut self, at: DateTime<Utc>) -> Option<KilowattHourRate>;

    fn unit(&self) -> String {
        format!("{}/kWh", self.currency())
    }

    async fn current_price(&mut self) -> Option<KilowattHourRate> {
        self.price(Utc::now()).await
    }

    /// Prices on the sampling grid from the first boundary at or after `start`.
    async fn prices(&mut self, start: DateTime<Utc>) -> ForecastSeries<KilowattHourRate> {
        let mut series = Vec::with_capacity(grid::N_POINTS);
        for time in grid::instants(&start) {
            let price = self.price(time).await.filter(|price| price.is_finite());
            series.push(Point::new(time, price));
        }
        series
    }
}
