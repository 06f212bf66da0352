//! [GEN-I](https://gen-i.si) retail tariffs.

use crate::{
    api::tariff::{Rates, Scheme, Tariff},
    prelude::*,
    quantity::Quantity,
};

const SINGLE: &str = "GENI (Enotarifno)";
const DUAL: &str = "GENI (Dvotarifno)";

const RATES: Rates = Rates {
    single: Quantity(0.13286),
    high: Quantity(0.14628),
    low: Quantity(0.11944),
};

#[must_use]
pub fn providers() -> Vec<String> {
    vec![SINGLE.to_owned(), DUAL.to_owned()]
}

pub fn try_new(provider: &str) -> Result<Tariff> {
    match provider {
        SINGLE => Ok(Tariff::new(RATES, Scheme::Single)),
        DUAL => Ok(Tariff::new(RATES, Scheme::Dual)),
        _ => bail!("unknown GEN-I provider `{provider}`"),
    }
}
