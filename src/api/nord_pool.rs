//! [Nord Pool](https://data.nordpoolgroup.com) day-ahead price indices.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::CET;
use lru::LruCache;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::{
    api::{client, price_oracle::PriceOracle},
    prelude::*,
    quantity::rate::KilowattHourRate,
};

const BASE_URL: &str = "https://dataportal-api.nordpoolgroup.com/api/DayAheadPriceIndices";

const RESOLUTION_MINUTES: u32 = 15;

/// Provider name, delivery area, and currency.
const AREAS: [(&str, &str, &str); 22] = [
    ("Eesti (NordPool)", "EE", "EUR"),
    ("Lietuva (NordPool)", "LT", "EUR"),
    ("Latvija (NordPool)", "LV", "EUR"),
    ("Österreich (NordPool)", "AT", "EUR"),
    ("Belgien (NordPool)", "BE", "EUR"),
    ("France (NordPool)", "FR", "EUR"),
    ("Deutschland (NordPool)", "GER", "EUR"),
    ("Nederland (NordPool)", "NL", "EUR"),
    ("Polska PLN (NordPool)", "PL", "PLN"),
    ("Danmark 1 DKK (NordPool)", "DK1", "DKK"),
    ("Danmark 2 DKK (NordPool)", "DK2", "DKK"),
    ("Suomi (NordPool)", "FI", "EUR"),
    ("Norge 1 NOK (NordPool)", "NO1", "NOK"),
    ("Norge 2 NOK (NordPool)", "NO2", "NOK"),
    ("Norge 3 NOK (NordPool)", "NO3", "NOK"),
    ("Norge 4 NOK (NordPool)", "NO4", "NOK"),
    ("Norge 5 NOK (NordPool)", "NO5", "NOK"),
    ("Sverige 1 SEK (NordPool)", "SE1", "SEK"),
    ("Sverige 2 SEK (NordPool)", "SE2", "SEK"),
    ("Sverige 3 SEK (NordPool)", "SE3", "SEK"),
    ("Sverige 4 SEK (NordPool)", "SE4", "SEK"),
    ("United Kingdom (NordPool)", "UK", "GBP"),
];

#[must_use]
pub fn providers() -> Vec<String> {
    AREAS.iter().map(|(provider, _, _)| (*provider).to_owned()).collect()
}

/// Quarter-hourly prices of a CET day, indexed by the quarter of the day.
type DayPrices = Vec<Option<KilowattHourRate>>;

pub struct Api {
    area: &'static str,
    currency: &'static str,
    base_url: Url,
    cache: LruCache<NaiveDate, DayPrices>,
}

impl Api {
    pub fn try_new(provider: &str) -> Result<Self> {
        let (_, area, currency) = AREAS
            .iter()
            .find(|(name, _, _)| *name == provider)
            .with_context(|| format!("unknown Nord Pool provider `{provider}`"))?;
        Ok(Self { area, currency, base_url: Url::parse(BASE_URL)?, cache: client::day_cache() })
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// The UK area trades on its own market.
    fn market(&self) -> &'static str {
        if self.area == "UK" { "N2EX_DayAhead" } else { "DayAhead" }
    }

    #[instrument(skip_all, fields(area = self.area, on = %on))]
    async fn fetch(&self, on: NaiveDate) -> Result<DayPrices> {
        info!("fetching…");
        let response = client::try_new()?
            .get(self.base_url.clone())
            .query(&[
                ("date", on.format("%Y-%m-%d").to_string().as_str()),
                ("market", self.market()),
                ("indexNames", self.area),
                ("currency", self.currency),
                ("resolutionInMinutes", &RESOLUTION_MINUTES.to_string()),
            ])
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?;
        ensure!(response.status() != StatusCode::NO_CONTENT, "no prices published yet");
        let prices = response
            .json::<PriceIndices>()
            .await
            .context("failed to deserialize the response")?
            .into_day_prices(self.area);
        ensure!(prices.iter().any(Option::is_some), "no prices for the area");
        info!(n_prices = prices.len(), "fetched");
        Ok(prices)
    }
}

#[async_trait]
impl PriceOracle for Api {
    fn currency(&self) -> &str {
        self.currency
    }

    async fn price(&mut self, at: DateTime<Utc>) -> Option<KilowattHourRate> {
        let local = at.with_timezone(&CET);
        let date = local.date_naive();
        let index = usize::try_from((local.hour() * 60 + local.minute()) / RESOLUTION_MINUTES).ok()?;
        if let Some(prices) = self.cache.get(&date) {
            return prices.get(index).copied().flatten();
        }
        match self.fetch(date).await {
            Ok(prices) => {
                let price = prices.get(index).copied().flatten();
                self.cache.put(date, prices);
                price
            }
            Err(error) => {
                warn!(on = %date, "no prices: {error:#}");
                None
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceIndices {
    #[serde(default)]
    multi_index_entries: Vec<IndexEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    #[serde(default)]
    entry_per_area: HashMap<String, Option<f64>>,
}

impl PriceIndices {
    fn into_day_prices(self, area: &str) -> DayPrices {
        self.multi_index_entries
            .into_iter()
            .map(|entry| {
                entry
                    .entry_per_area
                    .get(area)
                    .copied()
                    .flatten()
                    .filter(|price| price.is_finite())
                    .map(|price| KilowattHourRate::from(price / 1000.0))
            })
            .collect()
    }
}
