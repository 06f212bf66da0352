//! [Home Assistant REST API](https://developers.home-assistant.io/docs/api/rest) client.

mod history;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Client,
    ClientBuilder,
    StatusCode,
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};

use self::history::EntitiesHistory;
use crate::{
    core::point::Point,
    host::{EntityState, HistorySource, StateStore},
    prelude::*,
};

pub struct Api {
    client: Client,

    /// API root, for example `http://homeassistant.local:8123/api`.
    base_url: Url,
}

impl Api {
    pub fn try_new(access_token: &str, base_url: Url) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        )]);
        let client = ClientBuilder::new().default_headers(headers).build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl StateStore for Api {
    #[instrument(skip_all, fields(entity_id = entity_id))]
    async fn get(&self, entity_id: &str) -> Result<Option<EntityState>> {
        let response = self
            .client
            .get(self.url(&["states", entity_id])?)
            .send()
            .await
            .context("failed to call")?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("no such entity");
            return Ok(None);
        }
        let state = response
            .error_for_status()
            .context("request failed")?
            .json::<EntityState>()
            .await
            .context("failed to deserialize the entity state")?;
        Ok(Some(state))
    }

    #[instrument(skip_all, fields(entity_id = entity_id, state = state.state))]
    async fn set(&self, entity_id: &str, state: &EntityState) -> Result {
        self.client
            .post(self.url(&["states", entity_id])?)
            .json(state)
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?;
        debug!("published");
        Ok(())
    }
}

#[async_trait]
impl HistorySource for Api {
    #[instrument(skip_all, fields(entity_id = entity_id))]
    async fn history(
        &self,
        entity_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Point<f64>>> {
        let mut url = self.url(&["history", "period", &since.to_rfc3339()])?;
        url.query_pairs_mut()
            .append_pair("filter_entity_id", entity_id)
            .append_pair("end_time", &until.to_rfc3339())
            .append_pair("no_attributes", "true");
        info!("fetching the entity history…");
        let entities_history = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?
            .json::<EntitiesHistory>()
            .await
            .context("failed to deserialize the history")?;
        let mut points: Vec<Point<f64>> = entities_history
            .into_iter()
            .flatten()
            .filter(|state| state.value.is_finite())
            .map(Point::from)
            .collect();
        points.sort_by_key(|point| point.time);
        info!(n_points = points.len(), "fetched");
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn api(server: &mockito::ServerGuard) -> Result<Api> {
        Api::try_new("token", Url::parse(&format!("{}/api/", server.url()))?)
    }

    #[tokio::test]
    async fn test_get_state() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/states/sensor.power")
            .match_header("authorization", "Bearer token")
            .with_status(200)
            .with_body(r#"{"entity_id": "sensor.power", "state": "1.3", "attributes": {"unit_of_measurement": "kW"}}"#)
            .create_async()
            .await;
        let state = api(&server)?.get("sensor.power").await?.context("no state")?;
        assert_eq!(state.numeric_value(), Some(1.3));
        assert_eq!(state.unit(), Some("kW"));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_state() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/states/sensor.missing")
            .with_status(404)
            .create_async()
            .await;
        assert!(api(&server)?.get("sensor.missing").await?.is_none());
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_set_state() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/states/sensor.tally_total_cost")
            .match_body(Matcher::Json(json!({
                "state": "1.5",
                "attributes": {"unit_of_measurement": "EUR"},
            })))
            .with_status(200)
            .create_async()
            .await;
        let state = EntityState::new("1.5").with_attribute("unit_of_measurement", "EUR");
        api(&server)?.set("sensor.tally_total_cost", &state).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_history() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/api/history/period/2025-05-07".to_owned()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filter_entity_id".into(), "sensor.power".into()),
                Matcher::UrlEncoded("no_attributes".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                json!([[
                    {"state": "300", "last_changed": "2025-05-14T10:00:00+00:00"},
                    {"state": "unknown", "last_changed": "2025-05-14T09:00:00+00:00"},
                    {"state": "200", "last_changed": "2025-05-14T08:00:00+00:00"},
                ]])
                .to_string(),
            )
            .create_async()
            .await;
        let until = Utc.with_ymd_and_hms(2025, 5, 14, 12, 0, 0).unwrap();
        let since = until - chrono::TimeDelta::days(7);
        let history = api(&server)?.history("sensor.power", since, until).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, 200.0);
        assert_eq!(history[1].value, 300.0);
        mock.assert_async().await;
        Ok(())
    }
}
