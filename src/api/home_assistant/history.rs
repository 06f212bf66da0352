use chrono::{DateTime, Utc};
use serde_with::serde_as;

use crate::core::point::Point;

/// Response of `/api/history/period`: one list of state changes per entity.
#[must_use]
#[derive(serde::Deserialize, derive_more::IntoIterator)]
pub struct EntitiesHistory(pub Vec<EntityHistory>);

/// State changes of one entity, where the non-numeric states are skipped.
#[must_use]
#[serde_as]
#[derive(serde::Deserialize, derive_more::Index, derive_more::IntoIterator)]
pub struct EntityHistory(#[serde_as(as = "serde_with::VecSkipError<_>")] pub Vec<State>);

#[must_use]
#[serde_as]
#[derive(Copy, Clone, serde::Deserialize)]
pub struct State {
    #[serde(rename = "last_changed")]
    pub last_changed_at: DateTime<Utc>,

    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(rename = "state")]
    pub value: f64,
}

impl From<State> for Point<f64> {
    fn from(state: State) -> Self {
        Self::new(state.last_changed_at, state.value)
    }
}
