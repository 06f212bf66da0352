pub mod calendar;
pub mod grid;
pub mod point;
pub mod provider;
pub mod reconciler;
pub mod series;
