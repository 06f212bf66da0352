//! [ENTSO-E Transparency Platform](https://transparency.entsoe.eu) day-ahead prices.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use chrono_tz::CET;
use lru::LruCache;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    api::{client, price_oracle::PriceOracle},
    prelude::*,
    quantity::rate::KilowattHourRate,
};

const API_KEY_VARIABLE: &str = "ENTSOE_API_KEY";

const BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

/// Country whose bidding zones publish quarter-hourly series.
const QUARTER_HOURLY_COUNTRY: &str = "Italy";

/// Provider name, bidding zone EIC code, and country.
const BIDDING_ZONES: [(&str, &str, &str); 9] = [
    ("Ireland (ENTSOE)", "10Y1001A1001A59C", "Ireland"),
    ("Slovakia (ENTSOE)", "10YSK-SEPS-----K", "Slovakia"),
    ("Italy - North (ENTSOE)", "10Y1001A1001A73I", "Italy"),
    ("Italy - Central North (ENTSOE)", "10Y1001A1001A73I", "Italy"),
    ("Italy - Central South (ENTSOE)", "10Y1001A1001A71M", "Italy"),
    ("Italy - South (ENTSOE)", "10Y1001A1001A788", "Italy"),
    ("Italy - Calabria (ENTSOE)", "10Y1001C--00096J", "Italy"),
    ("Italy - Sicily (ENTSOE)", "10Y1001A1001A75E", "Italy"),
    ("Italy - Sardinia (ENTSOE)", "10Y1001A1001A74G", "Italy"),
];

/// Security token from the environment.
#[must_use]
pub fn api_key() -> Option<String> {
    std::env::var(API_KEY_VARIABLE).ok().filter(|key| !key.is_empty())
}

/// The providers are only offered when the security token is configured.
#[must_use]
pub fn providers() -> Vec<String> {
    providers_with(api_key().as_deref())
}

#[must_use]
fn providers_with(api_key: Option<&str>) -> Vec<String> {
    if api_key.is_none() {
        return Vec::new();
    }
    BIDDING_ZONES.iter().map(|(provider, _, _)| (*provider).to_owned()).collect()
}

type HourlyPrices = HashMap<NaiveDateTime, KilowattHourRate>;

pub struct Api {
    domain: &'static str,
    country: &'static str,
    api_key: Option<String>,
    base_url: Url,

    /// Hourly prices keyed by the CET calendar date.
    cache: LruCache<NaiveDate, HourlyPrices>,
}

impl Api {
    pub fn try_new(provider: &str) -> Result<Self> {
        let (_, domain, country) = BIDDING_ZONES
            .iter()
            .find(|(name, _, _)| *name == provider)
            .with_context(|| format!("unknown ENTSO-E provider `{provider}`"))?;
        Ok(Self {
            domain,
            country,
            api_key: api_key(),
            base_url: Url::parse(BASE_URL)?,
            cache: client::day_cache(),
        })
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    #[instrument(skip_all, fields(domain = self.domain, on = %on))]
    async fn fetch(&self, on: NaiveDate) -> Result<HourlyPrices> {
        let api_key = self.api_key.as_deref().context("the security token is not set")?;
        let start = on.and_hms_opt(0, 0, 0).context("invalid day start")?;
        let end = start + TimeDelta::days(1);
        info!("fetching…");
        let body = client::try_new()?
            .get(self.base_url.clone())
            .query(&[
                ("documentType", "A44"),
                ("out_Domain", self.domain),
                ("in_Domain", self.domain),
                ("periodStart", &start.format("%Y%m%d%H%M").to_string()),
                ("periodEnd", &end.format("%Y%m%d%H%M").to_string()),
                ("securityToken", api_key),
            ])
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?
            .text()
            .await
            .context("failed to read the response")?;
        let prices = parse_document(&body, self.country)?;
        ensure!(!prices.is_empty(), "no prices published yet");
        info!(n_prices = prices.len(), "fetched");
        Ok(prices)
    }
}

#[async_trait]
impl PriceOracle for Api {
    fn currency(&self) -> &str {
        "EUR"
    }

    async fn price(&mut self, at: DateTime<Utc>) -> Option<KilowattHourRate> {
        let local = at.with_timezone(&CET).naive_local();
        let hour = local.with_minute(0)?.with_second(0)?.with_nanosecond(0)?;
        let date = hour.date();
        if let Some(prices) = self.cache.get(&date) {
            return prices.get(&hour).copied();
        }
        match self.fetch(date).await {
            Ok(prices) => {
                let price = prices.get(&hour).copied();
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

/// Parse an `A44` publication document into hourly prices keyed by the naive CET time.
fn parse_document(xml: &str, country: &str) -> Result<HourlyPrices> {
    let document: PublicationDocument =
        quick_xml::de::from_str(xml).context("malformed publication document")?;
    let mut prices = HourlyPrices::new();
    for period in document.time_series.into_iter().flat_map(|time_series| time_series.periods) {
        period.collect_into(country, &mut prices);
    }
    Ok(prices)
}

#[derive(Deserialize)]
struct PublicationDocument {
    #[serde(rename = "TimeSeries", default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Deserialize)]
struct TimeSeries {
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Deserialize)]
struct Period {
    #[serde(rename = "timeInterval")]
    time_interval: Option<TimeInterval>,

    resolution: Option<String>,

    #[serde(rename = "Point", default)]
    points: Vec<PricePoint>,
}

#[derive(Deserialize)]
struct TimeInterval {
    start: Option<String>,
}

#[derive(Deserialize)]
struct PricePoint {
    position: Option<String>,

    #[serde(rename = "price.amount")]
    price_amount: Option<String>,
}

impl Period {
    fn collect_into(self, country: &str, prices: &mut HourlyPrices) {
        let Some(series_start) = self.series_start() else {
            debug!("skipped a period without a valid start");
            return;
        };
        let quarter_hourly = match self.resolution.as_deref() {
            Some("PT60M") => false,
            Some("PT15M") if country == QUARTER_HOURLY_COUNTRY => true,
            resolution => {
                debug!(?resolution, "skipped a period with an unexpected resolution");
                return;
            }
        };
        for point in self.points {
            let (Some(position), Some(amount)) = (point.position, point.price_amount) else {
                continue;
            };
            let (Ok(position), Ok(amount)) =
                (position.trim().parse::<i64>(), amount.trim().parse::<f64>())
            else {
                continue;
            };
            if position < 1 || !amount.is_finite() {
                continue;
            }
            let hour = if quarter_hourly { position / 4 } else { position - 1 };
            prices.insert(
                series_start + TimeDelta::hours(hour),
                KilowattHourRate::from_megawatt_hour_price(amount),
            );
        }
    }

    /// The UTC start of a delivery day is the evening before, so the local day is the next one.
    fn series_start(&self) -> Option<NaiveDateTime> {
        let start = self.time_interval.as_ref()?.start.as_deref()?;
        let start = NaiveDateTime::parse_from_str(start.trim(), "%Y-%m-%dT%H:%MZ").ok()?;
        (start.date() + TimeDelta::days(1)).and_hms_opt(0, 0, 0)
    }
}
