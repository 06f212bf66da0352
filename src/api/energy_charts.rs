//! [Energy-Charts](https://api.energy-charts.info) day-ahead prices.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Timelike, Utc};
use lru::LruCache;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    api::{client, price_oracle::PriceOracle},
    prelude::*,
    quantity::rate::KilowattHourRate,
};

const BASE_URL: &str = "https://api.energy-charts.info/price";

const BIDDING_ZONES: [(&str, &str); 3] = [
    ("Switzerland (Energy Charts)", "CH"),
    ("Czech Republic (Energy Charts)", "CZ"),
    ("Hungary (Energy Charts)", "HU"),
];

#[must_use]
pub fn providers() -> Vec<String> {
    BIDDING_ZONES.iter().map(|(provider, _)| (*provider).to_owned()).collect()
}

/// Hourly prices of a UTC day. The trailing hours are often not yet published.
type DayPrices = [Option<KilowattHourRate>; 24];

pub struct Api {
    bidding_zone: &'static str,
    base_url: Url,
    cache: LruCache<NaiveDate, DayPrices>,
}

impl Api {
    pub fn try_new(provider: &str) -> Result<Self> {
        let (_, bidding_zone) = BIDDING_ZONES
            .iter()
            .find(|(name, _)| *name == provider)
            .with_context(|| format!("unknown Energy-Charts provider `{provider}`"))?;
        Ok(Self { bidding_zone, base_url: Url::parse(BASE_URL)?, cache: client::day_cache() })
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    #[instrument(skip_all, fields(bidding_zone = self.bidding_zone, on = %on))]
    async fn fetch(&self, on: NaiveDate) -> Result<DayPrices> {
        let start = on.and_hms_opt(0, 0, 0).context("invalid day start")?;
        let end = start + TimeDelta::days(1) - TimeDelta::minutes(1);
        info!("fetching…");
        let response = client::try_new()?
            .get(self.base_url.clone())
            .query(&[
                ("bzn", self.bidding_zone),
                ("start", &start.format("%Y-%m-%dT%H:%M").to_string()),
                ("end", &end.format("%Y-%m-%dT%H:%M").to_string()),
            ])
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?
            .json::<PriceResponse>()
            .await
            .context("failed to deserialize the response")?;
        let prices = response.price.context("the response contains no prices")?;
        info!(n_prices = prices.len(), "fetched");
        Ok(into_day_prices(&prices))
    }
}

#[async_trait]
impl PriceOracle for Api {
    fn currency(&self) -> &str {
        "EUR"
    }

    async fn price(&mut self, at: DateTime<Utc>) -> Option<KilowattHourRate> {
        let date = at.date_naive();
        let hour = usize::try_from(at.hour()).ok()?;
        if let Some(price) = self.cache.get(&date).and_then(|prices| prices[hour]) {
            return Some(price);
        }
        // Either not cached yet, or the hour was not published at the time of the last fetch.
        match self.fetch(date).await {
            Ok(prices) => {
                self.cache.put(date, prices);
                prices[hour]
            }
            Err(error) => {
                warn!(on = %date, "no prices: {error:#}");
                None
            }
        }
    }
}

#[derive(Deserialize)]
struct PriceResponse {
    price: Option<Vec<Option<f64>>>,
}

fn into_day_prices(prices: &[Option<f64>]) -> DayPrices {
    let mut day_prices = [None; 24];
    for (slot, price) in day_prices.iter_mut().zip(prices) {
        *slot = price
            .filter(|price| price.is_finite())
            .map(KilowattHourRate::from_megawatt_hour_price);
    }
    day_prices
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use mockito::Matcher;

    use super::*;

    fn response(n_hours: usize) -> String {
        let prices: Vec<f64> = (0..n_hours).map(|hour| 100.0 + hour as f64).collect();
        serde_json::json!({ "license_info": "CC BY 4.0", "price": prices, "unit": "EUR / MWh" })
            .to_string()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 14, hour, 30, 0).unwrap()
    }

    async fn mock_day(server: &mut mockito::ServerGuard, body: String) -> mockito::Mock {
        server
            .mock("GET", "/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("bzn".into(), "CH".into()),
                Matcher::UrlEncoded("start".into(), "2025-05-14T00:00".into()),
                Matcher::UrlEncoded("end".into(), "2025-05-14T23:59".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    #[test]
    fn test_into_day_prices_pads_missing_hours() {
        let prices = into_day_prices(&[Some(105.0), None, Some(99.0)]);
        assert_abs_diff_eq!(prices[0].unwrap().0, 0.105);
        assert!(prices[1].is_none());
        assert_abs_diff_eq!(prices[2].unwrap().0, 0.099);
        assert!(prices[3..].iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_price_ok() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_day(&mut server, response(24)).await;
        let mut api = Api::try_new("Switzerland (Energy Charts)")?
            .with_base_url(Url::parse(&format!("{}/price", server.url()))?);
        assert_abs_diff_eq!(api.price(at(0)).await.context("no price")?.0, 0.1);
        assert_abs_diff_eq!(api.price(at(23)).await.context("no price")?.0, 0.123);
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_trailing_hours_are_refetched() -> Result {
        let mut server = mockito::Server::new_async().await;
        let partial = mock_day(&mut server, response(21)).await;
        let mut api = Api::try_new("Switzerland (Energy Charts)")?
            .with_base_url(Url::parse(&format!("{}/price", server.url()))?);
        assert!(api.price(at(20)).await.is_some());
        partial.assert_async().await;
        partial.remove_async().await;

        let complete = mock_day(&mut server, response(24)).await;
        assert_abs_diff_eq!(api.price(at(22)).await.context("no price")?.0, 0.122);
        complete.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_least_recently_used_day_is_evicted() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for day in 1..=11 {
            let mock = server
                .mock("GET", "/price")
                .match_query(Matcher::UrlEncoded(
                    "start".into(),
                    format!("2025-05-{day:02}T00:00"),
                ))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(response(24))
                .expect(if day == 1 { 2 } else { 1 })
                .create_async()
                .await;
            mocks.push(mock);
        }
        let mut api = Api::try_new("Czech Republic (Energy Charts)")?
            .with_base_url(Url::parse(&format!("{}/price", server.url()))?);
        let on = |day| Utc.with_ymd_and_hms(2025, 5, day, 12, 0, 0).unwrap();

        for day in 1..=10 {
            assert!(api.price(on(day)).await.is_some());
        }
        assert!(api.price(on(2)).await.is_some());
        // The eleventh day pushes out the first one, which is the least recently used.
        assert!(api.price(on(11)).await.is_some());
        assert!(api.price(on(2)).await.is_some());
        assert!(api.price(on(1)).await.is_some());

        for mock in mocks {
            mock.assert_async().await;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_response_without_prices() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/price")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"unit": "EUR / MWh"}"#)
            .expect(2)
            .create_async()
            .await;
        let mut api = Api::try_new("Hungary (Energy Charts)")?
            .with_base_url(Url::parse(&format!("{}/price", server.url()))?);
        assert!(api.price(at(1)).await.is_none());
        assert!(api.price(at(2)).await.is_none());
        mock.assert_async().await;
        Ok(())
    }

    #[test]
    fn test_unknown_provider() {
        assert!(Api::try_new("Slovenia (Energy Charts)").is_err());
    }
}
