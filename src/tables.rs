use chrono::Local;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    core::{grid, point::Point, provider::ProviderRegistry},
    quantity::rate::KilowattHourRate,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

pub fn build_providers_table(registry: &ProviderRegistry) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Provider", "Source"]);
    for provider in registry.providers() {
        let source = registry.source_of(provider);
        table.add_row(vec![
            Cell::new(provider),
            Cell::new(source.map_or_else(String::new, |source| format!("{source:?}")))
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_prices_table(prices: &[Point<Option<KilowattHourRate>>], unit: &str) -> Table {
    let known = prices
        .iter()
        .filter_map(|point| point.value)
        .sorted_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0))
        .collect_vec();
    let median = known.get(known.len() / 2).copied();

    let mut table = new_table();
    table.set_header(vec!["Start", "End", unit]);
    for point in prices {
        let start = point.time.with_timezone(&Local);
        let end = start + grid::INTERVAL;
        let price_cell = match (point.value, median) {
            (Some(price), Some(median)) => Cell::new(price)
                .set_alignment(CellAlignment::Right)
                .fg(if price >= median { Color::Red } else { Color::Green }),
            (Some(price), None) => Cell::new(price).set_alignment(CellAlignment::Right),
            (None, _) => Cell::new("n/a").set_alignment(CellAlignment::Right).add_attribute(Attribute::Dim),
        };
        table.add_row(vec![
            Cell::new(start.format("%a %H:%M")),
            Cell::new(end.format("%H:%M")).add_attribute(Attribute::Dim),
            price_cell,
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::{prelude::*, quantity::Quantity};

    #[test]
    fn test_build_prices_table() {
        let start = Utc.with_ymd_and_hms(2025, 5, 14, 13, 0, 0).unwrap();
        let prices = vec![
            Point::new(start, Some(Quantity(0.1))),
            Point::new(start + TimeDelta::minutes(15), None),
            Point::new(start + TimeDelta::minutes(30), Some(Quantity(0.3))),
        ];
        let table = build_prices_table(&prices, "EUR/kWh");
        assert_eq!(table.row_count(), 3);
        assert!(table.to_string().contains("n/a"));
    }

    #[test]
    fn test_build_providers_table() -> Result {
        let table = build_providers_table(&ProviderRegistry::try_new()?);
        assert!(table.to_string().contains("Eesti (NordPool)"));
        Ok(())
    }
}
