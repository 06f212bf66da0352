//! [Elektro energija](https://www.elektro-energija.si/za-dom/dokumenti-in-ceniki) retail tariffs.

use crate::{
    api::tariff::{Rates, Scheme, Tariff},
    prelude::*,
    quantity::Quantity,
};

const SINGLE: &str = "Elektro Ljubljana (Enotarifno)";
const DUAL: &str = "Elektro Ljubljana (Dvotarifno)";

// TODO: fetch the current price list instead of the rates published in 2025.
const RATES: Rates = Rates {
    single: Quantity(0.13896),
    high: Quantity(0.15238),
    low: Quantity(0.12554),
};

#[must_use]
pub fn providers() -> Vec<String> {
    vec![SINGLE.to_owned(), DUAL.to_owned()]
}

pub fn try_new(provider: &str) -> Result<Tariff> {
    match provider {
        SINGLE => Ok(Tariff::new(RATES, Scheme::Single)),
        DUAL => Ok(Tariff::new(RATES, Scheme::Dual)),
        _ => bail!("unknown Elektro Ljubljana provider `{provider}`"),
    }
}
