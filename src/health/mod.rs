// src/health/mod.rs
mod probe;
mod status;

pub use probe::{CheckOutcome, HealthProbe, HealthSnapshot};
pub use status::HealthDisplay;
