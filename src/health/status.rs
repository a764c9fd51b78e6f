// src/health/status.rs
use crate::client::HealthResponse;

/// What the page shows for the health check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HealthDisplay {
    /// Nothing fetched yet.
    #[default]
    Idle,
    Status(HealthResponse),
    Error(String),
}

impl HealthDisplay {
    /// JSON-stringified payload, the error string, or empty while idle.
    pub fn render(&self) -> String {
        match self {
            HealthDisplay::Idle => String::new(),
            HealthDisplay::Status(health) => {
                serde_json::json!({ "status": health.status }).to_string()
            }
            HealthDisplay::Error(message) => message.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HealthDisplay::Error(_))
    }
}
