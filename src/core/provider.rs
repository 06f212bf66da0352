use std::collections::HashMap;

use crate::{
    api::{elektro_ljubljana, energy_charts, entsoe, geni, nord_pool, price_oracle::PriceOracle},
    prelude::*,
};

/// Adapter type owning a set of provider names.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum Source {
    /// https://gen-i.si
    Geni,

    /// https://www.elektro-ljubljana.si
    ElektroLjubljana,

    /// https://transparency.entsoe.eu
    Entsoe,

    /// https://data.nordpoolgroup.com
    NordPool,

    /// https://energy-charts.info
    EnergyCharts,
}

impl Source {
    pub const ALL: [Self; 5] =
        [Self::Geni, Self::ElektroLjubljana, Self::Entsoe, Self::NordPool, Self::EnergyCharts];

    #[must_use]
    pub fn providers(self) -> Vec<String> {
        match self {
            Self::Geni => geni::providers(),
            Self::ElektroLjubljana => elektro_ljubljana::providers(),
            Self::Entsoe => entsoe::providers(),
            Self::NordPool => nord_pool::providers(),
            Self::EnergyCharts => energy_charts::providers(),
        }
    }

    pub fn create(self, provider: &str) -> Result<Box<dyn PriceOracle>> {
        Ok(match self {
            Self::Geni => Box::new(geni::try_new(provider)?),
            Self::ElektroLjubljana => Box::new(elektro_ljubljana::try_new(provider)?),
            Self::Entsoe => Box::new(entsoe::Api::try_new(provider)?),
            Self::NordPool => Box::new(nord_pool::Api::try_new(provider)?),
            Self::EnergyCharts => Box::new(energy_charts::Api::try_new(provider)?),
        })
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RegistryError {
    #[display("provider `{name}` is registered by both {first:?} and {second:?}")]
    DuplicateProvider { name: String, first: Source, second: Source },

    #[display("unknown provider `{name}`")]
    UnknownProvider { name: String },
}

/// Provider names of all adapters, resolved once at startup.
pub struct ProviderRegistry {
    names: Vec<String>,
    sources: HashMap<String, Source>,
}

impl ProviderRegistry {
    pub fn try_new() -> Result<Self, RegistryError> {
        Self::try_with_sources(Source::ALL.into_iter().map(|source| (source, source.providers())))
    }

    /// Build the registry from explicit provider lists, rejecting a name claimed twice.
    pub fn try_with_sources(
        sources: impl IntoIterator<Item = (Source, Vec<String>)>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self { names: Vec::new(), sources: HashMap::new() };
        for (source, names) in sources {
            for name in names {
                if let Some(first) = registry.sources.get(&name) {
                    return Err(RegistryError::DuplicateProvider {
                        name,
                        first: *first,
                        second: source,
                    });
                }
                registry.sources.insert(name.clone(), source);
                registry.names.push(name);
            }
        }
        debug!(n_providers = registry.names.len(), "registered the providers");
        Ok(registry)
    }

    #[must_use]
    pub fn providers(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn source_of(&self, provider: &str) -> Option<Source> {
        self.sources.get(provider).copied()
    }

    pub fn create(&self, provider: &str) -> Result<Box<dyn PriceOracle>> {
        let source = self
            .source_of(provider)
            .ok_or_else(|| RegistryError::UnknownProvider { name: provider.to_owned() })?;
        info!(provider, ?source, "creating the price oracle…");
        source.create(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_all_keyless_providers() -> Result {
        let registry = ProviderRegistry::try_new()?;
        let providers = registry.providers();
        assert!(providers.len() >= 2 + 2 + 22 + 3);
        assert_eq!(registry.source_of("GENI (Dvotarifno)"), Some(Source::Geni));
        assert_eq!(registry.source_of("Eesti (NordPool)"), Some(Source::NordPool));
        assert_eq!(
            registry.source_of("Switzerland (Energy Charts)"),
            Some(Source::EnergyCharts),
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_provider() {
        let result = ProviderRegistry::try_with_sources([
            (Source::Geni, geni::providers()),
            (Source::NordPool, vec!["GENI (Enotarifno)".to_owned()]),
        ]);
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateProvider { name, first: Source::Geni, second: Source::NordPool })
                if name == "GENI (Enotarifno)",
        ));
    }

    #[test]
    fn test_unknown_provider() -> Result {
        let registry = ProviderRegistry::try_new()?;
        let error = registry.create("Atlantis").err().context("created an unknown provider")?;
        assert!(matches!(
            error.downcast_ref::<RegistryError>(),
            Some(RegistryError::UnknownProvider { name }) if name == "Atlantis",
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tariff() -> Result {
        let registry = ProviderRegistry::try_new()?;
        let mut oracle = registry.create("Elektro Ljubljana (Enotarifno)")?;
        assert_eq!(oracle.unit(), "EUR/kWh");
        assert!(oracle.current_price().await.is_some());
        Ok(())
    }
}
