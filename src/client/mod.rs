// src/client/mod.rs
mod api;
mod error;

pub use api::{resolve_base_url, ApiClient, HealthApi, HealthResponse, HEALTH_PATH};
pub use error::{HealthCheckError, UNKNOWN_ERROR};
