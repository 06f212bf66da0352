mod prices;
mod watch;

use clap::{Parser, Subcommand};

pub use self::{prices::PricesArgs, watch::WatchArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the available price providers.
    #[clap(name = "providers")]
    Providers,

    /// Print the upcoming prices of a provider.
    #[clap(name = "prices")]
    Prices(PricesArgs),

    /// Main command: keep the price, consumption, and cost entities up to date.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),
}
