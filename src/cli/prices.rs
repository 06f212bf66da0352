use chrono::Utc;
use clap::Parser;

use crate::{core::provider::ProviderRegistry, prelude::*, tables::build_prices_table};

#[derive(Parser)]
pub struct PricesArgs {
    /// Provider name as listed by the `providers` command.
    #[clap(long, env = "PROVIDER")]
    provider: String,
}

impl PricesArgs {
    #[instrument(skip_all, fields(provider = self.provider))]
    pub async fn run(self, registry: &ProviderRegistry) -> Result {
        let mut oracle = registry.create(&self.provider)?;
        let current_price = oracle.current_price().await;
        let prices = oracle.prices(Utc::now()).await;
        let n_known = prices.iter().filter(|point| point.value.is_some()).count();
        info!(?current_price, n_known, "fetched the prices");
        println!("{}", build_prices_table(&prices, &oracle.unit()));
        Ok(())
    }
}
