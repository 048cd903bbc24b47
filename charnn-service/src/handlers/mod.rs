pub mod generate;
pub mod metrics;
