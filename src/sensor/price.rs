use chrono::{DateTime, Utc};

use crate::{
    api::price_oracle::PriceOracle,
    core::provider::ProviderRegistry,
    host::{EntityState, StateStore, forecast_attribute},
    prelude::*,
    sensor::{FORECAST_ATTRIBUTE, PRICE_ENTITY},
};

/// Current electricity price of the selected provider, with the forecast.
pub struct PriceSensor {
    provider: String,
    oracle: Box<dyn PriceOracle>,
}

impl PriceSensor {
    pub fn try_new(registry: &ProviderRegistry, provider: &str) -> Result<Self> {
        Ok(Self { provider: provider.to_owned(), oracle: registry.create(provider)? })
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Re-resolve the oracle when the configured provider changes.
    pub fn select_provider(&mut self, registry: &ProviderRegistry, provider: &str) -> Result {
        if provider == self.provider {
            return Ok(());
        }
        self.oracle = registry.create(provider)?;
        info!(from = self.provider, to = provider, "switched the provider");
        self.provider = provider.to_owned();
        Ok(())
    }

    #[instrument(skip_all, fields(provider = self.provider))]
    pub async fn update(&mut self, store: &dyn StateStore, now: DateTime<Utc>) -> Result<EntityState> {
        let price = self.oracle.price(now).await.filter(|price| price.is_finite());
        let forecast = self.oracle.prices(now).await;
        let n_known = forecast.iter().filter(|point| point.value.is_some()).count();
        info!(?price, n_known, "updated");

        let forecast: Vec<_> =
            forecast.into_iter().map(|point| point.map(|price| price.map(|price| price.0))).collect();
        let state = price
            .map_or_else(EntityState::unavailable, |price| EntityState::new(price.0))
            .with_attribute("unit_of_measurement", self.oracle.unit())
            .with_attribute("provider_name", self.provider.as_str())
            .with_attribute("icon", "mdi:currency-eur")
            .with_attribute(FORECAST_ATTRIBUTE, forecast_attribute(&forecast));
        store.set(PRICE_ENTITY, &state).await?;
        Ok(state)
    }
}
