use std::{path::PathBuf, time::Duration};

use bon::Builder;
use chrono::{TimeDelta, Utc};
use clap::Parser;
use reqwest::Url;
use tokio::{
    signal,
    time::{Interval, MissedTickBehavior, interval},
};

use crate::{
    api::home_assistant,
    core::provider::ProviderRegistry,
    host::{Host, MemoryStore},
    prelude::*,
    sensor::{
        BLACK_HOLE_ENTITY,
        consumer::ConsumerSensor,
        cost::CostSensor,
        price::PriceSensor,
        synthetic,
    },
    state::State,
};

#[derive(Parser)]
pub struct WatchArgs {
    /// Provider name as listed by the `providers` command. Defaults to the last used one.
    #[clap(long, env = "PROVIDER")]
    provider: Option<String>,

    /// Home Assistant API base URL. For example: `http://localhost:8123/api`.
    /// Without it, the entities are only kept in memory and logged.
    #[clap(long = "home-assistant-api-base-url", env = "HOME_ASSISTANT_API_BASE_URL")]
    home_assistant_base_url: Option<Url>,

    /// Home Assistant long-lived access token.
    #[clap(long = "home-assistant-access-token", env = "HOME_ASSISTANT_ACCESS_TOKEN")]
    home_assistant_access_token: Option<String>,

    /// Power entity to follow, for example `sensor.power_consumption`.
    #[clap(long, env = "CONSUMPTION_ENTITY_ID")]
    consumption_entity_id: Option<String>,

    /// Publish the simulated «black hole» load and follow it when no consumption entity is set.
    #[clap(long, env = "BLACK_HOLE")]
    black_hole: bool,

    #[clap(long, env = "STATE_PATH", default_value = "tally.toml")]
    state_path: PathBuf,

    #[clap(long, env = "PRICE_POLLING_INTERVAL", default_value = "5min")]
    price_polling_interval: humantime::Duration,

    #[clap(long, env = "CONSUMPTION_POLLING_INTERVAL", default_value = "60s")]
    consumption_polling_interval: humantime::Duration,

    #[clap(long, env = "COST_POLLING_INTERVAL", default_value = "30s")]
    cost_polling_interval: humantime::Duration,

    /// Consumption history the predictor is trained on.
    #[clap(long, env = "HISTORY_RETENTION", default_value = "7days")]
    history_retention: humantime::Duration,
}

impl WatchArgs {
    pub async fn run(self, registry: ProviderRegistry) -> Result {
        let state = State::read_from(&self.state_path);
        let host = self.connect()?;

        let mut price = {
            let provider = state
                .provider
                .as_deref()
                .filter(|provider| registry.source_of(provider).is_some())
                .or(self.provider.as_deref())
                .context("no provider selected, pass `--provider`")?;
            PriceSensor::try_new(&registry, provider)?
        };
        if let Some(provider) = &self.provider {
            price.select_provider(&registry, provider)?;
        }

        let source = self
            .consumption_entity_id
            .clone()
            .or_else(|| self.black_hole.then(|| BLACK_HOLE_ENTITY.to_owned()));
        let consumer = ConsumerSensor::seed(
            source,
            &*host,
            state.predictor,
            TimeDelta::from_std(self.history_retention.into())?,
            Utc::now(),
        )
        .await;

        Watcher::builder()
            .host(host)
            .price(price)
            .consumer(consumer)
            .cost(CostSensor::restore(state.cumulative_cost.as_ref()))
            .black_hole(self.black_hole)
            .state_path(self.state_path)
            .price_interval(self.price_polling_interval)
            .consumption_interval(self.consumption_polling_interval)
            .cost_interval(self.cost_polling_interval)
            .build()
            .run()
            .await
    }

    fn connect(&self) -> Result<Box<dyn Host>> {
        match (&self.home_assistant_base_url, &self.home_assistant_access_token) {
            (Some(base_url), Some(access_token)) => {
                Ok(Box::new(home_assistant::Api::try_new(access_token, base_url.clone())?))
            }
            (Some(_), None) => bail!("the Home Assistant access token is not set"),
            (None, _) => {
                warn!("no Home Assistant configured, keeping the entities in memory");
                Ok(Box::new(MemoryStore::default()))
            }
        }
    }
}

#[derive(Builder)]
struct Watcher {
    host: Box<dyn Host>,
    price: PriceSensor,
    consumer: ConsumerSensor,
    cost: CostSensor,
    black_hole: bool,
    state_path: PathBuf,

    #[builder(into)]
    price_interval: Duration,

    #[builder(into)]
    consumption_interval: Duration,

    #[builder(into)]
    cost_interval: Duration,
}

impl Watcher {
    async fn run(mut self) -> Result {
        let mut price_interval = new_interval(self.price_interval);
        let mut consumption_interval = new_interval(self.consumption_interval);
        let mut cost_interval = new_interval(self.cost_interval);
        let shutdown = signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(provider = self.price.provider(), "watching…");
        loop {
            // Each tick runs to completion before the next one starts.
            tokio::select! {
                biased;

                result = &mut shutdown => {
                    result?;
                    info!("interrupted");
                    break;
                }

                _ = price_interval.tick() => {
                    if let Err(error) = self.price.update(&*self.host, Utc::now()).await {
                        warn!("failed to update the price: {error:#}");
                    }
                }

                _ = consumption_interval.tick() => {
                    if self.black_hole
                        && let Err(error) = synthetic::update(&*self.host, Utc::now()).await
                    {
                        warn!("failed to update the black hole: {error:#}");
                    }
                    if let Err(error) = self.consumer.update(&*self.host, Utc::now()).await {
                        warn!("failed to update the consumption: {error:#}");
                    }
                }

                _ = cost_interval.tick() => {
                    match self.cost.update(&*self.host, Utc::now()).await {
                        Ok(state) => info!(cumulative = state.state, "cost updated"),
                        Err(error) => warn!("failed to update the cost: {error:#}"),
                    }
                    self.save();
                }
            }
        }

        self.save();
        Ok(())
    }

    fn save(&self) {
        State {
            cumulative_cost: Some(toml::Value::Float(self.cost.cumulative().0)),
            provider: Some(self.price.provider().to_owned()),
            predictor: Some(self.consumer.predictor().dump()),
        }
        .write_to(&self.state_path);
    }
}

fn new_interval(period: Duration) -> Interval {
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
