use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{prelude::*, statistics::predictor::Snapshot};

/// State persisted between runs.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Kept as a raw value: a corrupted number must not discard the rest of the state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_cost: Option<toml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictor: Option<Snapshot>,
}

impl State {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Self {
        Self::read_fallibly_from(path).unwrap_or_else(|error| {
            error!("failed to read the state, starting afresh: {error:#}");
            Self::default()
        })
    }

    fn read_fallibly_from(path: &Path) -> Result<Self> {
        if path.is_file() {
            Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
        } else {
            info!("no state file yet");
            Ok(Self::default())
        }
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn write_to(&self, path: &Path) {
        if let Err(error) = self.write_fallibly_to(path) {
            error!("failed to save the state: {error:#}");
        }
    }

    fn write_fallibly_to(&self, path: &Path) -> Result {
        std::fs::write(path, toml::to_string(self)?)?;
        debug!("saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{core::point::Point, statistics::predictor::Coefficients};

    fn temporary_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tally-{}-{name}.toml", std::process::id()))
    }

    #[test]
    fn test_write_read() -> Result {
        let path = temporary_path("write-read");
        let state = State {
            cumulative_cost: Some(toml::Value::Float(12.75)),
            provider: Some("Eesti (NordPool)".to_owned()),
            predictor: Some(Snapshot {
                model: Some(Coefficients { intercept: 300.0, weights: vec![0.5; 15] }),
                history: vec![Point::new(Utc.with_ymd_and_hms(2025, 5, 14, 10, 0, 0).unwrap(), 200.0)],
            }),
        };
        state.write_to(&path);
        let restored = State::read_from(&path);
        std::fs::remove_file(&path)?;
        assert_eq!(restored, state);
        Ok(())
    }

    #[test]
    fn test_read_missing() {
        assert_eq!(State::read_from(&temporary_path("missing")), State::default());
    }

    #[test]
    fn test_read_corrupted() -> Result {
        let path = temporary_path("corrupted");
        std::fs::write(&path, "cumulative_cost = [")?;
        let state = State::read_from(&path);
        std::fs::remove_file(&path)?;
        assert_eq!(state, State::default());
        Ok(())
    }

    #[test]
    fn test_read_non_numeric_cost() -> Result {
        let path = temporary_path("non-numeric");
        std::fs::write(&path, "cumulative_cost = \"unavailable\"\nprovider = \"GENI (Dvotarifno)\"\n")?;
        let state = State::read_from(&path);
        std::fs::remove_file(&path)?;
        assert_eq!(state.cumulative_cost, Some(toml::Value::String("unavailable".to_owned())));
        assert_eq!(state.provider.as_deref(), Some("GENI (Dvotarifno)"));
        Ok(())
    }
}
