// src/client/error.rs
use reqwest::StatusCode;
use std::time::Duration;

/// Shown when a failure carries no readable reason.
pub const UNKNOWN_ERROR: &str = "unknown error";

const MAX_REASON_CHARS: usize = 200;

/// Every way a health check can fail. Callers treat them uniformly as
/// "health check failed" and pick the detail out with [`reason`](Self::reason).
#[derive(Debug, thiserror::Error)]
pub enum HealthCheckError {
    #[error("invalid API base address {base:?}: {source}")]
    InvalidUrl {
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed with status code {}", .status.as_u16())]
    Status {
        status: StatusCode,
        reason: Option<String>,
    },

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("invalid health payload: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl HealthCheckError {
    /// Human-readable reason, when one can be extracted.
    pub fn reason(&self) -> Option<String> {
        match self {
            HealthCheckError::Status { status, reason } => reason
                .clone()
                .or_else(|| status.canonical_reason().map(str::to_string))
                .map(|reason| format!("{} ({})", reason, status.as_u16())),
            other => Some(other.to_string()),
        }
    }

    /// The string the UI shows in place of the status payload.
    pub fn user_message(&self) -> String {
        let reason = self
            .reason()
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        format!("health check failed: {}", reason)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HealthCheckError::Timeout(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HealthCheckError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pulls a reason out of an error response body: a `detail`, `error` or
/// `message` string of a JSON object, else the trimmed text itself.
pub(crate) fn extract_reason(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        let field = ["detail", "error", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(field) = field {
            return Some(truncate(field));
        }
    }

    Some(truncate(body))
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_REASON_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_from_json_detail() {
        assert_eq!(
            extract_reason(r#"{"detail": "database unavailable"}"#).as_deref(),
            Some("database unavailable")
        );
        assert_eq!(
            extract_reason(r#"{"code": 7, "error": "boom"}"#).as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn test_reason_from_plain_body() {
        assert_eq!(
            extract_reason("  Server Error  ").as_deref(),
            Some("Server Error")
        );
        assert_eq!(extract_reason("   "), None);
        assert_eq!(extract_reason(&"x".repeat(500)).map(|r| r.len()), Some(200));
    }

    #[test]
    fn test_status_reason_falls_back_to_canonical() {
        let err = HealthCheckError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            reason: None,
        };
        assert_eq!(err.reason().as_deref(), Some("Internal Server Error (500)"));
        assert_eq!(
            err.user_message(),
            "health check failed: Internal Server Error (500)"
        );
    }

    #[test]
    fn test_unknown_error_fallback() {
        let err = HealthCheckError::Status {
            status: StatusCode::from_u16(599).unwrap(),
            reason: None,
        };
        assert_eq!(err.reason(), None);
        assert_eq!(err.user_message(), "health check failed: unknown error");
    }

    #[test]
    fn test_timeout_message() {
        let err = HealthCheckError::Timeout(Duration::from_millis(15_000));
        assert!(err.is_timeout());
        assert_eq!(
            err.user_message(),
            "health check failed: timeout of 15000ms exceeded"
        );
    }
}
