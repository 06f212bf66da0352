pub mod client;
pub mod elektro_ljubljana;
pub mod energy_charts;
pub mod entsoe;
pub mod geni;
pub mod home_assistant;
pub mod nord_pool;
pub mod price_oracle;
pub mod tariff;
