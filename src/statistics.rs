pub mod features;
pub mod predictor;
