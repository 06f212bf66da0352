#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod host;
mod prelude;
mod quantity;
mod sensor;
mod state;
mod statistics;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    core::provider::ProviderRegistry,
    prelude::*,
    tables::build_providers_table,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let registry = ProviderRegistry::try_new()?;

    match args.command {
        Command::Providers => {
            println!("{}", build_providers_table(&registry));
        }
        Command::Prices(args) => {
            args.run(&registry).await?;
        }
        Command::Watch(args) => {
            args.run(registry).await?;
        }
    }

    info!("done!");
    Ok(())
}
