// src/client/api.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::error::{extract_reason, HealthCheckError};
use crate::config::ClientConfig;

/// Health endpoint, relative to the API base. The trailing slash is part of
/// the backend route.
pub const HEALTH_PATH: &str = "health/";

/// Body of `GET {base}/health/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Anything that can answer a health check. [`ApiClient`] talks HTTP; tests
/// substitute their own.
#[async_trait]
pub trait HealthApi: Send + Sync {
    async fn fetch_health(&self) -> Result<HealthResponse, HealthCheckError>;
}

/// Request channel to the backend: fixed base URL, timeout, and a cookie
/// store so credentials always travel with each request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl ApiClient {
    /// Builds a client whose relative `api_base` resolves against
    /// `frontend_origin`, the way a browser resolves it against the page.
    pub fn new(config: &ClientConfig, frontend_origin: &str) -> Result<Self, HealthCheckError> {
        let base_url = resolve_base_url(&config.api_base, frontend_origin)?;
        Self::with_base_url(base_url, config)
    }

    pub fn with_base_url(mut base_url: Url, config: &ClientConfig) -> Result<Self, HealthCheckError> {
        // Keep the last path segment when joining relative paths.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .build()
            .map_err(HealthCheckError::Client)?;

        Ok(Self {
            http,
            base_url,
            timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, HealthCheckError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| HealthCheckError::InvalidUrl {
                base: self.base_url.to_string(),
                source,
            })
    }

    fn classify(&self, err: reqwest::Error) -> HealthCheckError {
        if err.is_timeout() {
            HealthCheckError::Timeout(self.timeout)
        } else if err.is_decode() {
            HealthCheckError::Decode(err)
        } else {
            HealthCheckError::Network(err)
        }
    }
}

#[async_trait]
impl HealthApi for ApiClient {
    async fn fetch_health(&self) -> Result<HealthResponse, HealthCheckError> {
        let url = self.endpoint(HEALTH_PATH)?;
        debug!(%url, "requesting backend health");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) if e.is_timeout() => return Err(self.classify(e)),
                Err(e) => {
                    debug!(%url, %status, error = %e, "failed to read error body");
                    String::new()
                }
            };
            let reason = extract_reason(&body);
            warn!(%url, %status, reason = ?reason, "health check rejected");
            return Err(HealthCheckError::Status { status, reason });
        }

        let health = response
            .json::<HealthResponse>()
            .await
            .map_err(|e| self.classify(e))?;
        debug!(%url, status = %health.status, "backend healthy");
        Ok(health)
    }
}

/// An absolute http(s) base is used as is, anything else is joined onto the
/// front-end origin.
pub fn resolve_base_url(api_base: &str, frontend_origin: &str) -> Result<Url, HealthCheckError> {
    let invalid = |source| HealthCheckError::InvalidUrl {
        base: api_base.to_string(),
        source,
    };

    match Url::parse(api_base) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            let origin = Url::parse(frontend_origin).map_err(invalid)?;
            origin.join(api_base).map_err(invalid)
        }
        Err(e) => Err(invalid(e)),
    }
}
